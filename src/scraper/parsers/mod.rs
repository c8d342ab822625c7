//! HTML parsers for portal pages.
//!
//! The portal renders server-side WebObjects HTML: ad-hoc `result-set`
//! tables whose column order drifts between seasons. Every parser locates
//! columns by header text instead of position and skips rows it cannot
//! make sense of.

pub mod club;
pub mod group;
pub mod meeting;
pub mod team;

pub use club::{ClubMeetingsParser, ClubSearchParser};
pub use group::GroupPageParser;
pub use meeting::MeetingReportParser;
pub use team::TeamPortraitParser;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Selector};

use crate::normalize::normalize_name;

/// Map a table's header cells to their column indices, keyed by normalized
/// header text ("heimmannschaft" → 5).
pub(crate) fn header_map(table: &ElementRef) -> HashMap<String, usize> {
    let th_selector = Selector::parse("th").unwrap();
    table
        .select(&th_selector)
        .enumerate()
        .map(|(i, th)| (normalize_name(&th.text().collect::<String>()), i))
        .collect()
}

/// Find the column for any of the given keys. An exact header match wins
/// over a substring match; among several substring matches the leftmost
/// column wins, so "verein" never lands on "vereinsnr" when both exist.
pub(crate) fn find_column(headers: &HashMap<String, usize>, keys: &[&str]) -> Option<usize> {
    for key in keys {
        if let Some(idx) = headers.get(*key) {
            return Some(*idx);
        }
        let candidate = headers
            .iter()
            .filter(|(name, _)| name.contains(key))
            .map(|(_, idx)| *idx)
            .min();
        if candidate.is_some() {
            return candidate;
        }
    }
    None
}

/// Trimmed text of the cell at `idx`, if present.
pub(crate) fn cell_text(cells: &[ElementRef], idx: usize) -> Option<String> {
    cells.get(idx).map(|c| {
        c.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// Parse a German date ("15.11.2025", optionally prefixed "So. 15.11.2025").
pub(crate) fn parse_german_date(text: &str) -> Option<NaiveDate> {
    let re = regex::Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap();
    let caps = re.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )
}

/// Parse a clock time ("10:00", "19:30 Uhr").
pub(crate) fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let re = regex::Regex::new(r"(\d{1,2}):(\d{2})").unwrap();
    let caps = re.captures(text)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

/// Parse a "for:against" pair ("9:0", "45:18"). Dashes and empty cells mean
/// the value is not available yet.
pub(crate) fn parse_point_pair(text: &str) -> Option<(u32, u32)> {
    let re = regex::Regex::new(r"^\s*(\d+)\s*:\s*(\d+)\s*$").unwrap();
    let caps = re.captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Extract a numeric query parameter from the first matching link in an
/// element ("...meetingReport?...&meeting=7250341" → 7250341).
pub(crate) fn link_param(elem: &ElementRef, param: &str) -> Option<i64> {
    let a_selector = Selector::parse("a").unwrap();
    let re = regex::Regex::new(&format!(r"[?&]{}=(\d+)", regex::escape(param))).unwrap();
    for a in elem.select(&a_selector) {
        if let Some(href) = a.value().attr("href") {
            if let Some(caps) = re.captures(href) {
                return caps[1].parse().ok();
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_parse_german_date() {
        assert_eq!(
            parse_german_date("So. 15.11.2025"),
            NaiveDate::from_ymd_opt(2025, 11, 15)
        );
        assert_eq!(parse_german_date("unplayed"), None);
    }

    #[test]
    fn test_parse_point_pair() {
        assert_eq!(parse_point_pair("9:0"), Some((9, 0)));
        assert_eq!(parse_point_pair(" 45:18 "), Some((45, 18)));
        assert_eq!(parse_point_pair("-:-"), None);
        assert_eq!(parse_point_pair(""), None);
        // A clock time is a valid pair shape; callers pick the column first
        assert_eq!(parse_point_pair("10:00"), Some((10, 0)));
    }

    #[test]
    fn test_link_param() {
        let html = Html::parse_fragment(
            r#"<td><a href="/wa/meetingReport?championship=X&meeting=7250341">9:0</a></td>"#,
        );
        let root = html.root_element();
        assert_eq!(link_param(&root, "meeting"), Some(7250341));
        assert_eq!(link_param(&root, "club"), None);
    }

    #[test]
    fn test_header_map_and_find_column() {
        let html = Html::parse_fragment(
            "<table><tr><th>Datum</th><th>Heimmannschaft</th><th>Gastmannschaft</th></tr></table>",
        );
        let table_sel = Selector::parse("table").unwrap();
        let table = html.select(&table_sel).next().unwrap();
        let headers = header_map(&table);
        assert_eq!(find_column(&headers, &["heimmannschaft"]), Some(1));
        assert_eq!(find_column(&headers, &["gast"]), Some(2));
        assert_eq!(find_column(&headers, &["matchpunkte"]), None);
    }
}
