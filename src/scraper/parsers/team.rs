//! Team portrait parser: the roster table.
//!
//! A team portrait lists the nominated players in ranking order with their
//! LK rating and a link carrying the portal person id.

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use super::group::extract_category;
use super::{cell_text, find_column, header_map, link_param};
use crate::error::ScrapeError;

/// One roster entry
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedPlayer {
    /// Ranking position within the team
    pub position: u32,
    /// Display name as printed, "Lastname, Firstname"
    pub name: String,
    /// LK rating ("LK 8,5" → 8.5)
    pub lk_rating: Option<f64>,
    /// Portal person id from the player link
    pub person_id: Option<i64>,
}

/// Parsed team portrait
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamPortrait {
    /// Team label as printed in the heading ("SV Sürth 1")
    pub team_label: Option<String>,
    pub category: Option<String>,
    pub players: Vec<ScrapedPlayer>,
}

/// Parser for team portrait pages
pub struct TeamPortraitParser;

impl TeamPortraitParser {
    pub fn parse(html: &str) -> Result<TeamPortrait, ScrapeError> {
        let document = Html::parse_document(html);
        let mut portrait = TeamPortrait::default();

        for selector_str in ["h1", ".page-title", "h2"] {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(elem) = document.select(&selector).next() {
                    let text = elem
                        .text()
                        .collect::<String>()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ");
                    if text.len() > 2 {
                        portrait.category = extract_category(&text);
                        portrait.team_label = Some(strip_category_suffix(&text));
                        break;
                    }
                }
            }
        }

        let table_selector = Selector::parse("table.result-set, table").unwrap();
        for table in document.select(&table_selector) {
            let headers = header_map(&table);
            // The roster table is the one with an LK column
            if find_column(&headers, &["lk"]).is_none()
                || find_column(&headers, &["name", "spieler"]).is_none()
            {
                continue;
            }
            portrait.players = parse_roster(&table);
            if !portrait.players.is_empty() {
                break;
            }
        }

        Ok(portrait)
    }
}

/// Heading texts read "SV Sürth 1 (Herren 30)"; keep only the label.
fn strip_category_suffix(text: &str) -> String {
    let re = Regex::new(r"\s*\([^)]*\)\s*$").unwrap();
    re.replace(text, "").trim().to_string()
}

fn parse_roster(table: &scraper::ElementRef) -> Vec<ScrapedPlayer> {
    let headers = header_map(table);
    let pos_col = find_column(&headers, &["pos", "rang"]);
    let lk_col = find_column(&headers, &["lk"]);
    let name_col = find_column(&headers, &["name", "spieler"]);

    let Some(name_col) = name_col else {
        return Vec::new();
    };

    let row_selector = Selector::parse("tr").unwrap();
    let td_selector = Selector::parse("td").unwrap();

    let mut players = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<_> = row.select(&td_selector).collect();
        if cells.len() <= name_col {
            continue;
        }

        let name = cell_text(&cells, name_col).unwrap_or_default();
        if name.is_empty() {
            continue;
        }

        let position = pos_col
            .and_then(|c| cell_text(&cells, c))
            .and_then(|t| t.trim_end_matches('.').parse().ok())
            .unwrap_or(players.len() as u32 + 1);

        players.push(ScrapedPlayer {
            position,
            name,
            lk_rating: lk_col.and_then(|c| cell_text(&cells, c)).and_then(|t| parse_lk(&t)),
            person_id: link_param(&row, "person"),
        });
    }
    players
}

/// Parse an LK rating: "LK 8,5", "8,5", "LK 21.0".
fn parse_lk(text: &str) -> Option<f64> {
    let re = Regex::new(r"(\d{1,2})[,.](\d)").unwrap();
    if let Some(caps) = re.captures(text) {
        return format!("{}.{}", &caps[1], &caps[2]).parse().ok();
    }
    // Whole-number ratings ("LK 25")
    let re = Regex::new(r"(\d{1,2})").unwrap();
    re.captures(text)?.get(1)?.as_str().parse().ok()
}
