//! Web scraper module for the nuLiga tennis portal.
//!
//! Provides the HTTP client, rate limiting, page cache, and HTML parsers.

pub mod cache;
pub mod client;
pub mod parsers;
pub mod rate_limiter;

pub use client::PortalClient;
pub use rate_limiter::RateLimiter;

/// Default portal host for the TVM federation
pub const BASE_URL: &str = "https://tvm.liga.nu";

/// WebObjects application path all portal pages hang off
pub const WA_PATH: &str = "/cgi-bin/WebObjects/nuLigaTENDE.woa/wa";

/// Encode a query parameter the way the portal expects.
///
/// Championships carry spaces and season slashes ("TVM Sommer 2026",
/// "Winter 2025/26"); the portal accepts '+' for spaces.
fn encode_param(value: &str) -> String {
    value.replace(' ', "+").replace('/', "%2F")
}

/// Build a league group page URL (standings + fixture plan)
pub fn group_page_url(base: &str, championship: &str, group: &str) -> String {
    format!(
        "{}{}/groupPage?championship={}&group={}",
        base,
        WA_PATH,
        encode_param(championship),
        group
    )
}

/// Build a club meetings URL (all fixtures of a club)
pub fn club_meetings_url(base: &str, championship: &str, club_number: i64) -> String {
    format!(
        "{}{}/clubMeetings?championship={}&club={}",
        base,
        WA_PATH,
        encode_param(championship),
        club_number
    )
}

/// Build a team portrait URL (roster page)
pub fn team_portrait_url(base: &str, championship: &str, team_table: i64) -> String {
    format!(
        "{}{}/teamPortrait?championship={}&teamtable={}",
        base,
        WA_PATH,
        encode_param(championship),
        team_table
    )
}

/// Build a meeting report URL (per-line match results)
pub fn meeting_report_url(base: &str, championship: &str, meeting_id: i64) -> String {
    format!(
        "{}{}/meetingReport?championship={}&meeting={}",
        base,
        WA_PATH,
        encode_param(championship),
        meeting_id
    )
}

/// Build the club search endpoint URL (form POST target)
pub fn club_search_url(base: &str) -> String {
    format!("{}{}/clubSearch", base, WA_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_page_url() {
        let url = group_page_url(BASE_URL, "TVM Sommer 2026", "035");
        assert_eq!(
            url,
            "https://tvm.liga.nu/cgi-bin/WebObjects/nuLigaTENDE.woa/wa/groupPage?championship=TVM+Sommer+2026&group=035"
        );
    }

    #[test]
    fn test_winter_season_slash_is_encoded() {
        let url = group_page_url(BASE_URL, "TVM Winter 2025/26", "012");
        assert!(url.contains("championship=TVM+Winter+2025%2F26"));
    }

    #[test]
    fn test_meeting_report_url() {
        let url = meeting_report_url(BASE_URL, "TVM Sommer 2026", 7250341);
        assert!(url.ends_with("/meetingReport?championship=TVM+Sommer+2026&meeting=7250341"));
    }

    #[test]
    fn test_club_meetings_url() {
        let url = club_meetings_url(BASE_URL, "TVM Sommer 2026", 36124);
        assert!(url.contains("clubMeetings"));
        assert!(url.ends_with("club=36124"));
    }
}
