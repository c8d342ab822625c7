//! Group page parser: standings table and fixture plan.
//!
//! A group page carries the league heading ("Herren 30 2. Bezirksliga
//! Gr. 035"), the current standings, and the full fixture plan with links
//! to the individual meeting reports.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use super::{
    cell_text, find_column, header_map, link_param, parse_clock_time, parse_german_date,
    parse_point_pair,
};
use crate::error::ScrapeError;

/// One row of the standings table
#[derive(Debug, Clone, Serialize)]
pub struct StandingRow {
    pub rank: u32,
    pub team: String,
    pub played: u32,
    pub match_points: Option<(u32, u32)>,
    pub table_points: Option<(u32, u32)>,
    /// Portal team-table id from the team link, when present
    pub team_table: Option<i64>,
}

/// One row of a fixture plan
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedFixture {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub home: String,
    pub away: String,
    pub venue: Option<String>,
    /// Portal meeting id, linked once a report exists
    pub meeting_id: Option<i64>,
    /// Final match points (home, away); None while unplayed
    pub result: Option<(u32, u32)>,
    /// League label; set on club pages where each row names its league
    pub league: Option<String>,
}

/// Parsed group page
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupPage {
    pub heading: Option<String>,
    pub category: Option<String>,
    pub group: Option<String>,
    pub standings: Vec<StandingRow>,
    pub fixtures: Vec<ScrapedFixture>,
}

impl GroupPage {
    pub fn is_empty(&self) -> bool {
        self.standings.is_empty() && self.fixtures.is_empty()
    }
}

/// Parser for group pages
pub struct GroupPageParser;

impl GroupPageParser {
    /// Parse a group page. An unrecognizable page yields an empty result;
    /// the caller decides whether that is worth reporting.
    pub fn parse(html: &str) -> Result<GroupPage, ScrapeError> {
        let document = Html::parse_document(html);
        let mut page = GroupPage::default();

        Self::parse_heading(&document, &mut page);

        let table_selector = Selector::parse("table.result-set, table").unwrap();
        for table in document.select(&table_selector) {
            let headers = header_map(&table);
            if headers.is_empty() {
                continue;
            }

            if find_column(&headers, &["rang"]).is_some()
                && find_column(&headers, &["mannschaft"]).is_some()
            {
                page.standings = parse_standings(&table);
            } else if find_column(&headers, &["heimmannschaft", "heim"]).is_some()
                && find_column(&headers, &["gastmannschaft", "gast"]).is_some()
            {
                page.fixtures = parse_fixtures(&table, None);
            }
        }

        Ok(page)
    }

    fn parse_heading(document: &Html, page: &mut GroupPage) {
        for selector_str in ["h1", ".page-title", "h2"] {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(elem) = document.select(&selector).next() {
                    let text = elem
                        .text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    if text.len() > 3 {
                        page.category = extract_category(&text);
                        page.group = extract_group(&text);
                        page.heading = Some(text);
                        return;
                    }
                }
            }
        }
    }
}

/// Pull the age/gender class out of a league heading.
pub fn extract_category(text: &str) -> Option<String> {
    let re = Regex::new(
        r"(?i)\b(Herren|Damen|Senioren|Seniorinnen|Junioren|Juniorinnen|Knaben|M.dchen)\s*(\d+)?\b",
    )
    .unwrap();
    let caps = re.captures(text)?;
    let mut category = caps[1].to_string();
    if let Some(age) = caps.get(2) {
        category.push(' ');
        category.push_str(age.as_str());
    }
    Some(category)
}

/// Pull the group identifier out of a league heading ("Gr. 035").
fn extract_group(text: &str) -> Option<String> {
    let re = Regex::new(r"(?:Gr\.|Gruppe)\s*([0-9A-Za-z]+)").unwrap();
    Some(re.captures(text)?[1].to_string())
}

fn parse_standings(table: &scraper::ElementRef) -> Vec<StandingRow> {
    let headers = header_map(table);
    let rank_col = find_column(&headers, &["rang"]);
    let team_col = find_column(&headers, &["mannschaft"]);
    let played_col = find_column(&headers, &["begegnungen", "spiele"]);
    let match_points_col = find_column(&headers, &["matchpunkte"]);
    let table_points_col = find_column(&headers, &["tabellenpunkte"]);

    let (Some(rank_col), Some(team_col)) = (rank_col, team_col) else {
        return Vec::new();
    };

    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<_> = row.select(&td_selector).collect();
        if cells.len() <= team_col.max(rank_col) {
            continue;
        }

        // "1." → 1
        let rank_text = cell_text(&cells, rank_col).unwrap_or_default();
        let Ok(rank) = rank_text.trim_end_matches('.').parse::<u32>() else {
            tracing::debug!("skipping standings row with rank {:?}", rank_text);
            continue;
        };

        let team = clean_team_name(&cell_text(&cells, team_col).unwrap_or_default());
        if team.is_empty() {
            continue;
        }

        rows.push(StandingRow {
            rank,
            team,
            played: played_col
                .and_then(|c| cell_text(&cells, c))
                .and_then(|t| t.parse().ok())
                .unwrap_or(0),
            match_points: match_points_col
                .and_then(|c| cell_text(&cells, c))
                .and_then(|t| parse_point_pair(&t)),
            table_points: table_points_col
                .and_then(|c| cell_text(&cells, c))
                .and_then(|t| parse_point_pair(&t)),
            team_table: cells.get(team_col).and_then(|c| link_param(c, "teamtable")),
        });
    }
    rows
}

/// Parse a fixture table. `league_col` is used on club pages where each row
/// names its league.
pub(super) fn parse_fixtures(
    table: &scraper::ElementRef,
    league_col_keys: Option<&[&str]>,
) -> Vec<ScrapedFixture> {
    let headers = header_map(table);
    let date_col = find_column(&headers, &["datum"]);
    let time_col = find_column(&headers, &["uhrzeit", "zeit"]);
    let home_col = find_column(&headers, &["heimmannschaft", "heim"]);
    let away_col = find_column(&headers, &["gastmannschaft", "gast"]);
    let venue_col = find_column(&headers, &["halle", "anlage"]);
    let points_col = find_column(&headers, &["matchpunkte", "ergebnis"]);
    let league_col = league_col_keys.and_then(|keys| find_column(&headers, keys));

    let (Some(home_col), Some(away_col)) = (home_col, away_col) else {
        return Vec::new();
    };

    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut fixtures = Vec::new();
    // The portal leaves the date cell blank for later rows of the same day
    let mut last_date: Option<NaiveDate> = None;

    for row in table.select(&row_selector) {
        let cells: Vec<_> = row.select(&td_selector).collect();
        if cells.len() <= home_col.max(away_col) {
            continue;
        }

        let date = date_col
            .and_then(|c| cell_text(&cells, c))
            .and_then(|t| parse_german_date(&t))
            .or(last_date);
        let Some(date) = date else {
            tracing::debug!("skipping fixture row without a date");
            continue;
        };
        last_date = Some(date);

        let home = clean_team_name(&cell_text(&cells, home_col).unwrap_or_default());
        let away = clean_team_name(&cell_text(&cells, away_col).unwrap_or_default());
        if home.is_empty() || away.is_empty() {
            tracing::debug!("skipping fixture row with missing team on {}", date);
            continue;
        }

        fixtures.push(ScrapedFixture {
            date,
            time: time_col
                .and_then(|c| cell_text(&cells, c))
                .and_then(|t| parse_clock_time(&t)),
            home,
            away,
            venue: venue_col
                .and_then(|c| cell_text(&cells, c))
                .filter(|t| !t.is_empty()),
            meeting_id: link_param(&row, "meeting"),
            result: points_col
                .and_then(|c| cell_text(&cells, c))
                .and_then(|t| parse_point_pair(&t)),
            league: league_col
                .and_then(|c| cell_text(&cells, c))
                .filter(|t| !t.is_empty()),
        });
    }
    fixtures
}

/// Strip portal remark markers from a team cell ("SV Sürth 1 *" or a
/// trailing "(zurückgezogen)").
pub(super) fn clean_team_name(raw: &str) -> String {
    let re = Regex::new(r"(?i)\s*\((zur.ckgezogen|kampflos)\)\s*").unwrap();
    re.replace_all(raw, "")
        .trim_end_matches(|c| c == '*' || c == ' ')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<h1>Herren 30 2. Bezirksliga Gr. 035</h1>
<table class="result-set">
    <tr><th>Rang</th><th>Mannschaft</th><th>Begegnungen</th><th>Matchpunkte</th><th>Tabellenpunkte</th></tr>
    <tr><td>1.</td><td><a href="/wa/teamPortrait?teamtable=111">SV Sürth 1</a></td><td>7</td><td>45:18</td><td>12:2</td></tr>
    <tr><td>2.</td><td><a href="/wa/teamPortrait?teamtable=222">TC Köln-Süd 2</a></td><td>7</td><td>40:23</td><td>10:4</td></tr>
</table>
<table class="result-set">
    <tr><th>Tag</th><th>Datum</th><th>Uhrzeit</th><th>Halle</th><th>Heimmannschaft</th><th>Gastmannschaft</th><th>Matchpunkte</th></tr>
    <tr><td>Sa.</td><td>15.11.2025</td><td>18:00</td><td>4101</td><td>SV Sürth 1</td><td>TC Köln-Süd 2</td>
        <td><a href="/wa/meetingReport?championship=TVM+Winter+2025%2F26&meeting=7250341">9:0</a></td></tr>
    <tr><td></td><td></td><td>20:00</td><td>4101</td><td>TG Rodenkirchen</td><td>KTHC Stadion Rot-Weiss *</td>
        <td>-:-</td></tr>
    <tr><td>So.</td><td>23.11.2025</td><td>10:00</td><td>4102</td><td>TC Köln-Süd 2</td><td>TG Rodenkirchen</td>
        <td></td></tr>
</table>
</body>
</html>"#;

    #[test]
    fn test_parse_heading() {
        let page = GroupPageParser::parse(SAMPLE_HTML).unwrap();
        assert_eq!(
            page.heading.as_deref(),
            Some("Herren 30 2. Bezirksliga Gr. 035")
        );
        assert_eq!(page.category.as_deref(), Some("Herren 30"));
        assert_eq!(page.group.as_deref(), Some("035"));
    }

    #[test]
    fn test_parse_standings() {
        let page = GroupPageParser::parse(SAMPLE_HTML).unwrap();
        assert_eq!(page.standings.len(), 2);

        let first = &page.standings[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.team, "SV Sürth 1");
        assert_eq!(first.played, 7);
        assert_eq!(first.match_points, Some((45, 18)));
        assert_eq!(first.table_points, Some((12, 2)));
        assert_eq!(first.team_table, Some(111));
    }

    #[test]
    fn test_parse_fixtures() {
        let page = GroupPageParser::parse(SAMPLE_HTML).unwrap();
        assert_eq!(page.fixtures.len(), 3);

        let played = &page.fixtures[0];
        assert_eq!(played.date, NaiveDate::from_ymd_opt(2025, 11, 15).unwrap());
        assert_eq!(played.time, NaiveTime::from_hms_opt(18, 0, 0));
        assert_eq!(played.home, "SV Sürth 1");
        assert_eq!(played.away, "TC Köln-Süd 2");
        assert_eq!(played.meeting_id, Some(7250341));
        assert_eq!(played.result, Some((9, 0)));
    }

    #[test]
    fn test_date_carries_forward_for_blank_cells() {
        let page = GroupPageParser::parse(SAMPLE_HTML).unwrap();
        let second = &page.fixtures[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2025, 11, 15).unwrap());
        assert_eq!(second.result, None);
        // Host remark marker is stripped
        assert_eq!(second.away, "KTHC Stadion Rot-Weiss");
    }

    #[test]
    fn test_unplayed_fixture_has_no_result() {
        let page = GroupPageParser::parse(SAMPLE_HTML).unwrap();
        let future = &page.fixtures[2];
        assert_eq!(future.result, None);
        assert_eq!(future.meeting_id, None);
    }

    #[test]
    fn test_empty_page() {
        let page = GroupPageParser::parse("<html><body>Keine Daten</body></html>").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_clean_team_name() {
        assert_eq!(clean_team_name("SV Sürth 1 *"), "SV Sürth 1");
        assert_eq!(
            clean_team_name("TC Blau-Gold (zurückgezogen)"),
            "TC Blau-Gold"
        );
    }
}
