//! Fetch → parse → match → reconcile orchestration per CLI command.
//!
//! Pages are fetched sequentially through the rate limiter. A transport or
//! parse failure on one page is recorded in the report and the run
//! continues; only setup problems (database, configuration) abort.

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::reconcile::{Outcome, Reconciler, SyncReport};
use crate::scraper::cache::CacheCategory;
use crate::scraper::parsers::club::ClubSearchHit;
use crate::scraper::parsers::group::ScrapedFixture;
use crate::scraper::parsers::{
    ClubMeetingsParser, ClubSearchParser, GroupPageParser, MeetingReportParser, TeamPortraitParser,
};
use crate::scraper::{
    club_meetings_url, club_search_url, group_page_url, meeting_report_url, team_portrait_url,
    PortalClient,
};
use crate::storage::Repository;

/// One sync run against the portal
pub struct Pipeline {
    client: PortalClient,
    repo: Repository,
    config: AppConfig,
    apply: bool,
}

impl Pipeline {
    pub fn new(config: AppConfig, apply: bool, refresh: bool) -> Result<Self> {
        let client = PortalClient::new(&config.portal, refresh)?;
        let repo = Repository::open(Path::new(&config.database.path))?;
        Ok(Self {
            client,
            repo,
            config,
            apply,
        })
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.repo, self.apply, self.config.matching.accept_threshold)
    }

    /// Sync a league group: standings, fixture plan, and optionally the
    /// meeting reports of every played fixture.
    pub async fn sync_group(&self, group: &str, with_results: bool) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let championship = self.config.portal.championship.clone();
        let season = self.config.sync.season.clone();

        let url = group_page_url(&self.config.portal.base_url, &championship, group);
        let cache_key = format!("{}-{}", championship, group);
        let html = match self
            .client
            .fetch_cached(CacheCategory::GroupPage, &cache_key, &url)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                report.record("page", url.as_str(), Outcome::Failed, Some(e.to_string()));
                return Ok(report);
            }
        };

        let page = GroupPageParser::parse(&html)?;
        if page.is_empty() {
            report.record(
                "page",
                url.as_str(),
                Outcome::Failed,
                Some("no standings or fixtures recognized".to_string()),
            );
            return Ok(report);
        }

        let group_label = page.group.clone().unwrap_or_else(|| group.to_string());
        let league = page.heading.as_deref();
        let category = page.category.as_deref();
        info!(
            "group {}: {} standings rows, {} fixtures",
            group_label,
            page.standings.len(),
            page.fixtures.len()
        );

        let mut reconciler = self.reconciler();

        for row in &page.standings {
            let team_id = reconciler.resolve_team(
                &row.team,
                &season,
                category,
                league,
                Some(&group_label),
                row.team_table,
                &mut report,
            )?;
            match team_id {
                Some(team_id) => {
                    reconciler.reconcile_standing(row, team_id, &season, &group_label, &mut report)?
                }
                None => report.record(
                    "standing",
                    format!("{} #{}", row.team, row.rank),
                    Outcome::Skipped,
                    Some("team not in database yet".to_string()),
                ),
            }
        }

        let mut played_meetings = Vec::new();
        for fixture in &page.fixtures {
            reconciler.reconcile_fixture(
                fixture,
                &season,
                category,
                league,
                Some(&group_label),
                &mut report,
            )?;
            if let (Some(meeting_id), Some(_)) = (fixture.meeting_id, fixture.result) {
                played_meetings.push(meeting_id);
            }
        }

        if with_results {
            info!("fetching {} meeting reports", played_meetings.len());
            for meeting_id in played_meetings {
                self.sync_one_meeting(&mut reconciler, meeting_id, &mut report)
                    .await?;
            }
        }

        Ok(report)
    }

    /// Sync all fixtures of a club across its teams.
    pub async fn sync_club(&self, club_number: i64) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let championship = self.config.portal.championship.clone();
        let season = self.config.sync.season.clone();

        let url = club_meetings_url(&self.config.portal.base_url, &championship, club_number);
        let html = match self
            .client
            .fetch_cached(CacheCategory::ClubMeetings, &club_number.to_string(), &url)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                report.record("page", url.as_str(), Outcome::Failed, Some(e.to_string()));
                return Ok(report);
            }
        };

        let fixtures = ClubMeetingsParser::parse(&html)?;
        if fixtures.is_empty() {
            report.record(
                "page",
                url.as_str(),
                Outcome::Failed,
                Some("no fixtures recognized".to_string()),
            );
            return Ok(report);
        }
        info!("club {}: {} fixtures", club_number, fixtures.len());

        let mut reconciler = self.reconciler();
        for fixture in &fixtures {
            reconciler.reconcile_fixture(fixture, &season, None, None, None, &mut report)?;
        }

        Ok(report)
    }

    /// Sync a team's roster from its portrait page.
    pub async fn sync_roster(&self, team_table: i64) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let championship = self.config.portal.championship.clone();
        let season = self.config.sync.season.clone();

        let url = team_portrait_url(&self.config.portal.base_url, &championship, team_table);
        let html = match self
            .client
            .fetch_cached(CacheCategory::TeamPortrait, &team_table.to_string(), &url)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                report.record("page", url.as_str(), Outcome::Failed, Some(e.to_string()));
                return Ok(report);
            }
        };

        let portrait = TeamPortraitParser::parse(&html)?;
        let Some(team_label) = portrait.team_label.clone() else {
            report.record(
                "page",
                url.as_str(),
                Outcome::Failed,
                Some("no team heading recognized".to_string()),
            );
            return Ok(report);
        };
        info!("team {}: {} roster entries", team_label, portrait.players.len());

        let mut reconciler = self.reconciler();
        let team_id = reconciler.resolve_team(
            &team_label,
            &season,
            portrait.category.as_deref(),
            None,
            None,
            Some(team_table),
            &mut report,
        )?;

        match team_id {
            Some(team_id) => {
                reconciler.reconcile_roster(team_id, &portrait.players, &mut report)?;
            }
            None => report.record(
                "roster",
                team_label.as_str(),
                Outcome::Skipped,
                Some("dry run, team not in database yet".to_string()),
            ),
        }

        Ok(report)
    }

    /// Sync meeting reports by portal meeting id.
    pub async fn sync_results(&self, meeting_ids: &[i64]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut reconciler = self.reconciler();
        for &meeting_id in meeting_ids {
            self.sync_one_meeting(&mut reconciler, meeting_id, &mut report)
                .await?;
        }
        Ok(report)
    }

    /// Fetch one meeting report and reconcile its fixture and lines.
    async fn sync_one_meeting(
        &self,
        reconciler: &mut Reconciler<'_>,
        meeting_id: i64,
        report: &mut SyncReport,
    ) -> Result<()> {
        let label = format!("meeting {}", meeting_id);
        let url = meeting_report_url(
            &self.config.portal.base_url,
            &self.config.portal.championship,
            meeting_id,
        );

        let html = match self
            .client
            .fetch_cached(CacheCategory::MeetingReport, &meeting_id.to_string(), &url)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                warn!("{} fetch failed: {}", label, e);
                report.record("meeting", label, Outcome::Failed, Some(e.to_string()));
                return Ok(());
            }
        };

        let meeting = match MeetingReportParser::parse(&html) {
            Ok(meeting) => meeting,
            Err(e) => {
                warn!("{} parse failed: {}", label, e);
                report.record("meeting", label, Outcome::Failed, Some(e.to_string()));
                return Ok(());
            }
        };

        // Locate the fixture, creating it from the report header when the
        // plan has not been synced yet
        let (season, date) = match self.repo.find_fixture_by_meeting(meeting_id)? {
            Some(row) => (row.record.season.clone(), row.record.match_date),
            None => {
                let Some(date) = meeting.date else {
                    report.record(
                        "meeting",
                        label,
                        Outcome::Failed,
                        Some("report names no date".to_string()),
                    );
                    return Ok(());
                };
                (self.config.sync.season.clone(), date)
            }
        };

        let fixture = ScrapedFixture {
            date,
            time: None,
            home: meeting.home_team.clone(),
            away: meeting.away_team.clone(),
            venue: None,
            meeting_id: Some(meeting_id),
            result: meeting.score,
            league: None,
        };
        let fixture_id =
            reconciler.reconcile_fixture(&fixture, &season, None, None, None, report)?;

        let Some(fixture_id) = fixture_id else {
            // Dry run against an empty database; the fixture outcome above
            // already tells the story
            return Ok(());
        };

        let row = self.repo.get_fixture(fixture_id)?;
        reconciler.reconcile_meeting_lines(
            fixture_id,
            row.record.home_team_id,
            row.record.away_team_id,
            &meeting,
            report,
        )?;
        debug!(
            "{}: {} lines stored",
            label,
            self.repo.count_lines(fixture_id)?
        );
        Ok(())
    }

    /// Search clubs by name via the portal's form endpoint and reconcile
    /// the hits.
    pub async fn search_clubs(&self, pattern: &str) -> Result<(Vec<ClubSearchHit>, SyncReport)> {
        let mut report = SyncReport::default();
        let url = club_search_url(&self.config.portal.base_url);
        let federation = self
            .config
            .portal
            .championship
            .split_whitespace()
            .next()
            .unwrap_or("TVM")
            .to_string();

        let html = self
            .client
            .post_form(&url, &[("federation", federation.as_str()), ("searchPattern", pattern)])
            .await?;

        let hits = ClubSearchParser::parse(&html)?;
        let mut reconciler = self.reconciler();
        for hit in &hits {
            reconciler.reconcile_club(
                &hit.name,
                hit.city.as_deref(),
                hit.club_number,
                &mut report,
            )?;
        }

        Ok((hits, report))
    }

    /// Row counts per table.
    pub fn stats(&self) -> Result<Vec<(String, i64)>> {
        self.repo.table_counts()
    }
}
