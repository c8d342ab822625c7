//! Meeting report parser: per-line results of one team match.
//!
//! A report page names the two teams, the date, and one table per rubber
//! group (singles, doubles) with the players and set scores per line.

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use super::{cell_text, find_column, header_map, parse_german_date, parse_point_pair};
use crate::error::ScrapeError;

/// Singles or doubles rubber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Singles,
    Doubles,
}

impl LineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Singles => "singles",
            LineKind::Doubles => "doubles",
        }
    }
}

/// One result line of a meeting
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedLine {
    /// Sequential line number across the whole meeting, 1-based
    pub line_no: u32,
    pub kind: LineKind,
    /// One name for singles, two for doubles
    pub home_players: Vec<String>,
    pub away_players: Vec<String>,
    /// Per-set games, (home, away)
    pub sets: Vec<(u32, u32)>,
}

impl ScrapedLine {
    /// Sets won by each side
    pub fn sets_won(&self) -> (u32, u32) {
        let mut home = 0;
        let mut away = 0;
        for (h, a) in &self.sets {
            if h > a {
                home += 1;
            } else if a > h {
                away += 1;
            }
        }
        (home, away)
    }

    /// Render the raw set scores as stored ("6:3 6:4")
    pub fn set_scores(&self) -> String {
        self.sets
            .iter()
            .map(|(h, a)| format!("{}:{}", h, a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parsed meeting report
#[derive(Debug, Clone, Serialize)]
pub struct MeetingReport {
    pub home_team: String,
    pub away_team: String,
    pub date: Option<NaiveDate>,
    /// Final match points when the page prints an "Endstand"
    pub score: Option<(u32, u32)>,
    pub lines: Vec<ScrapedLine>,
}

/// Parser for meeting report pages
pub struct MeetingReportParser;

impl MeetingReportParser {
    pub fn parse(html: &str) -> Result<MeetingReport, ScrapeError> {
        let document = Html::parse_document(html);

        let (home_team, away_team) = Self::parse_teams(&document)
            .ok_or_else(|| ScrapeError::Parse("meeting header names no teams".into()))?;

        let full_text = document.root_element().text().collect::<String>();
        let date = parse_german_date(&full_text);
        let score_re = Regex::new(r"(?i)endstand\s*:?\s*(\d+)\s*:\s*(\d+)").unwrap();
        let score = score_re
            .captures(&full_text)
            .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)));

        let mut lines = Vec::new();
        let table_selector = Selector::parse("table.result-set, table").unwrap();
        for table in document.select(&table_selector) {
            let headers = header_map(&table);
            // A rubber table has set columns plus home/guest players
            if find_column(&headers, &["satz"]).is_none() {
                continue;
            }
            parse_rubber_table(&table, &mut lines);
        }

        Ok(MeetingReport {
            home_team,
            away_team,
            date,
            score,
            lines,
        })
    }

    /// The heading prints "SV Sürth 1 - TC Köln-Süd 2".
    fn parse_teams(document: &Html) -> Option<(String, String)> {
        let re = Regex::new(r"^(.+?)\s+[-–:]\s+(.+)$").unwrap();
        for selector_str in ["h1", ".page-title", "h2"] {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            for elem in document.select(&selector) {
                let text = elem
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                let text = text.trim_start_matches("Begegnung:").trim().to_string();
                if let Some(caps) = re.captures(&text) {
                    let home = caps[1].trim().to_string();
                    let away = caps[2].trim().to_string();
                    if !home.is_empty() && !away.is_empty() {
                        return Some((home, away));
                    }
                }
            }
        }
        None
    }
}

fn parse_rubber_table(table: &scraper::ElementRef, lines: &mut Vec<ScrapedLine>) {
    let headers = header_map(table);
    let home_col = find_column(&headers, &["heim"]);
    let away_col = find_column(&headers, &["gast"]);
    let (Some(home_col), Some(away_col)) = (home_col, away_col) else {
        return;
    };

    // Set columns in printed order ("1. Satz", "2. Satz", "3. Satz")
    let mut set_cols: Vec<usize> = headers
        .iter()
        .filter(|(name, _)| name.contains("satz"))
        .map(|(_, idx)| *idx)
        .collect();
    set_cols.sort_unstable();

    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    for row in table.select(&row_selector) {
        let cells: Vec<_> = row.select(&td_selector).collect();
        if cells.len() <= home_col.max(away_col) {
            continue;
        }

        let home_players = split_players(&cell_text(&cells, home_col).unwrap_or_default());
        let away_players = split_players(&cell_text(&cells, away_col).unwrap_or_default());
        if home_players.is_empty() || away_players.is_empty() {
            tracing::debug!("skipping rubber row with missing players");
            continue;
        }

        let sets: Vec<(u32, u32)> = set_cols
            .iter()
            .filter_map(|&c| cell_text(&cells, c))
            .filter_map(|t| parse_point_pair(&t))
            .collect();

        let kind = if home_players.len() > 1 || away_players.len() > 1 {
            LineKind::Doubles
        } else {
            LineKind::Singles
        };

        lines.push(ScrapedLine {
            line_no: lines.len() as u32 + 1,
            kind,
            home_players,
            away_players,
            sets,
        });
    }
}

/// Split a player cell into names: "Müller, H. / Weber, K." → two names.
fn split_players(text: &str) -> Vec<String> {
    text.split('/')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<h1>Begegnung: SV Sürth 1 - TC Köln-Süd 2</h1>
<p class="smalltxt">Sa. 15.11.2025 18:00, Endstand 5:1</p>
<h2>Einzel</h2>
<table class="result-set">
    <tr><th>Nr</th><th>Heim</th><th>Gast</th><th>1. Satz</th><th>2. Satz</th><th>3. Satz</th></tr>
    <tr><td>1</td><td>Müller, Hans</td><td>Schmidt, Peter</td><td>6:3</td><td>6:4</td><td></td></tr>
    <tr><td>2</td><td>Weber, Klaus</td><td>Braun, Michael</td><td>4:6</td><td>6:3</td><td>10:7</td></tr>
    <tr><td>3</td><td>Fischer, Jan</td><td>Wolf, Thomas</td><td>2:6</td><td>3:6</td><td></td></tr>
    <tr><td>4</td><td>Becker, Tim</td><td>Krause, Stefan</td><td>6:2</td><td>6:2</td><td></td></tr>
</table>
<h2>Doppel</h2>
<table class="result-set">
    <tr><th>Nr</th><th>Heim</th><th>Gast</th><th>1. Satz</th><th>2. Satz</th><th>3. Satz</th></tr>
    <tr><td>1</td><td>Müller, H. / Weber, K.</td><td>Schmidt, P. / Braun, M.</td><td>6:3</td><td>7:5</td><td></td></tr>
    <tr><td>2</td><td>Fischer, J. / Becker, T.</td><td>Wolf, T. / Krause, S.</td><td>7:6</td><td>6:4</td><td></td></tr>
</table>
</body>
</html>"#;

    #[test]
    fn test_parse_header() {
        let report = MeetingReportParser::parse(SAMPLE_HTML).unwrap();
        assert_eq!(report.home_team, "SV Sürth 1");
        assert_eq!(report.away_team, "TC Köln-Süd 2");
        assert_eq!(report.date, NaiveDate::from_ymd_opt(2025, 11, 15));
        assert_eq!(report.score, Some((5, 1)));
    }

    #[test]
    fn test_lines_numbered_across_tables() {
        let report = MeetingReportParser::parse(SAMPLE_HTML).unwrap();
        assert_eq!(report.lines.len(), 6);
        assert_eq!(report.lines[0].kind, LineKind::Singles);
        assert_eq!(report.lines[4].kind, LineKind::Doubles);
        assert_eq!(report.lines[4].line_no, 5);
    }

    #[test]
    fn test_set_scores_and_winners() {
        let report = MeetingReportParser::parse(SAMPLE_HTML).unwrap();

        let straight = &report.lines[0];
        assert_eq!(straight.sets, vec![(6, 3), (6, 4)]);
        assert_eq!(straight.sets_won(), (2, 0));
        assert_eq!(straight.set_scores(), "6:3 6:4");

        let tiebreak = &report.lines[1];
        assert_eq!(tiebreak.sets, vec![(4, 6), (6, 3), (10, 7)]);
        assert_eq!(tiebreak.sets_won(), (2, 1));
    }

    #[test]
    fn test_doubles_players_split() {
        let report = MeetingReportParser::parse(SAMPLE_HTML).unwrap();
        let doubles = &report.lines[4];
        assert_eq!(doubles.home_players, vec!["Müller, H.", "Weber, K."]);
        assert_eq!(doubles.away_players.len(), 2);
    }

    #[test]
    fn test_missing_header_is_a_parse_error() {
        let result = MeetingReportParser::parse("<html><body><h1>Spielbericht</h1></body></html>");
        assert!(matches!(result, Err(ScrapeError::Parse(_))));
    }
}
