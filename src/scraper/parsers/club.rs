//! Club pages: the meetings list and the club search form results.
//!
//! The club meetings page shows every fixture of a club across all its
//! teams, each row tagged with its league label. The search results page
//! maps free-text club names to portal club numbers.

use scraper::{Html, Selector};
use serde::Serialize;

use super::group::{parse_fixtures, ScrapedFixture};
use super::{cell_text, find_column, header_map, link_param};
use crate::error::ScrapeError;

/// Parser for club meetings pages
pub struct ClubMeetingsParser;

impl ClubMeetingsParser {
    /// Parse all fixtures on a club meetings page. Rows carry their league
    /// label in a "Liga"/"Staffel" column.
    pub fn parse(html: &str) -> Result<Vec<ScrapedFixture>, ScrapeError> {
        let document = Html::parse_document(html);
        let table_selector = Selector::parse("table.result-set, table").unwrap();

        let mut fixtures = Vec::new();
        for table in document.select(&table_selector) {
            let headers = header_map(&table);
            if find_column(&headers, &["heimmannschaft", "heim"]).is_none()
                || find_column(&headers, &["gastmannschaft", "gast"]).is_none()
            {
                continue;
            }
            fixtures.extend(parse_fixtures(&table, Some(&["liga", "staffel"])));
        }

        Ok(fixtures)
    }
}

/// One hit from the club search results
#[derive(Debug, Clone, Serialize)]
pub struct ClubSearchHit {
    pub name: String,
    pub club_number: Option<i64>,
    pub city: Option<String>,
}

/// Parser for club search result pages
pub struct ClubSearchParser;

impl ClubSearchParser {
    pub fn parse(html: &str) -> Result<Vec<ClubSearchHit>, ScrapeError> {
        let document = Html::parse_document(html);
        let table_selector = Selector::parse("table.result-set, table").unwrap();
        let row_selector = Selector::parse("tr").unwrap();
        let td_selector = Selector::parse("td").unwrap();

        let mut hits = Vec::new();
        for table in document.select(&table_selector) {
            let headers = header_map(&table);
            let Some(name_col) = find_column(&headers, &["verein"]) else {
                continue;
            };
            let number_col = find_column(&headers, &["vereinsnr", "nr"]);
            let city_col = find_column(&headers, &["ort"]);

            for row in table.select(&row_selector) {
                let cells: Vec<_> = row.select(&td_selector).collect();
                if cells.len() <= name_col {
                    continue;
                }
                let name = cell_text(&cells, name_col).unwrap_or_default();
                if name.is_empty() {
                    continue;
                }

                // Prefer the explicit number column, fall back to the link
                let club_number = number_col
                    .and_then(|c| cell_text(&cells, c))
                    .and_then(|t| t.parse().ok())
                    .or_else(|| link_param(&row, "club"));

                hits.push(ClubSearchHit {
                    name,
                    club_number,
                    city: city_col
                        .and_then(|c| cell_text(&cells, c))
                        .filter(|t| !t.is_empty()),
                });
            }
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const MEETINGS_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<h1>TC Köln-Süd</h1>
<table class="result-set">
    <tr><th>Datum</th><th>Uhrzeit</th><th>Liga</th><th>Heimmannschaft</th><th>Gastmannschaft</th><th>Matchpunkte</th></tr>
    <tr><td>15.11.2025</td><td>18:00</td><td>H30 2. Bezirksliga Gr. 035</td><td>SV Sürth 1</td><td>TC Köln-Süd 2</td><td>3:6</td></tr>
    <tr><td>22.11.2025</td><td>14:00</td><td>Damen 1. Kreisliga Gr. 012</td><td>TC Köln-Süd</td><td>TG Rodenkirchen</td><td>-:-</td></tr>
</table>
</body>
</html>"#;

    const SEARCH_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<table class="result-set">
    <tr><th>Verein</th><th>Vereinsnr.</th><th>Ort</th></tr>
    <tr><td><a href="/wa/clubInfoDisplay?club=36124">TC Köln-Süd</a></td><td>36124</td><td>Köln</td></tr>
    <tr><td><a href="/wa/clubInfoDisplay?club=36077">SV Sürth</a></td><td>36077</td><td>Köln</td></tr>
</table>
</body>
</html>"#;

    #[test]
    fn test_parse_meetings_with_league_labels() {
        let fixtures = ClubMeetingsParser::parse(MEETINGS_HTML).unwrap();
        assert_eq!(fixtures.len(), 2);

        assert_eq!(
            fixtures[0].league.as_deref(),
            Some("H30 2. Bezirksliga Gr. 035")
        );
        assert_eq!(fixtures[0].result, Some((3, 6)));
        assert_eq!(
            fixtures[1].date,
            NaiveDate::from_ymd_opt(2025, 11, 22).unwrap()
        );
        assert_eq!(fixtures[1].result, None);
    }

    #[test]
    fn test_parse_search_hits() {
        let hits = ClubSearchParser::parse(SEARCH_HTML).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "TC Köln-Süd");
        assert_eq!(hits[0].club_number, Some(36124));
        assert_eq!(hits[0].city.as_deref(), Some("Köln"));
    }

    #[test]
    fn test_search_number_from_link_when_column_missing() {
        let html = r#"<table>
            <tr><th>Verein</th></tr>
            <tr><td><a href="/wa/clubInfoDisplay?club=99">TC Test</a></td></tr>
        </table>"#;
        let hits = ClubSearchParser::parse(html).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].club_number, Some(99));
    }

    #[test]
    fn test_empty_page_yields_no_fixtures() {
        let fixtures = ClubMeetingsParser::parse("<html></html>").unwrap();
        assert!(fixtures.is_empty());
    }
}
