//! Reconciliation of scraped entities into the database.
//!
//! The reconciler is the only stage with side effects. Every decision is
//! update-if-exists-else-insert against the unique keys: clubs by
//! normalized name (or portal club number), teams by (club, ordinal,
//! category, season), fixtures by (season, date, home, away), result lines
//! by (fixture, line number). Nothing is ever deleted, and a dry run
//! computes every outcome without writing.

use std::collections::HashMap;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::matcher::{best_match, MatchOutcome, MatchRule};
use crate::normalize::{candidate_keys, normalize_name, normalize_player_name, split_team_label};
use crate::scraper::parsers::group::{ScrapedFixture, StandingRow};
use crate::scraper::parsers::meeting::MeetingReport;
use crate::scraper::parsers::team::ScrapedPlayer;
use crate::storage::repository::{FixtureRecord, LineRecord, StandingRecord};
use crate::storage::Repository;

/// Per-entity reconciliation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Entity resolved to an existing row, nothing to change
    Matched,
    Created,
    Updated,
    /// Nothing to do (already up to date, or dependencies missing in a dry run)
    Skipped,
    /// No stored row cleared the matching bar
    Unmatched,
    /// Transport/parse/write failure on this item
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Skipped => "skipped",
            Outcome::Unmatched => "unmatched",
            Outcome::Failed => "failed",
        }
    }
}

/// One reported item
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub entity: String,
    pub label: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated result of one reconciliation pass
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub matched: u32,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub unmatched: u32,
    pub failed: u32,
    pub items: Vec<ItemReport>,
    /// Player names on result lines that no stored row matched
    pub missing_players: Vec<String>,
}

impl SyncReport {
    pub fn record(
        &mut self,
        entity: &str,
        label: impl Into<String>,
        outcome: Outcome,
        detail: Option<String>,
    ) {
        match outcome {
            Outcome::Matched => self.matched += 1,
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Unmatched => self.unmatched += 1,
            Outcome::Failed => self.failed += 1,
        }
        self.items.push(ItemReport {
            entity: entity.to_string(),
            label: label.into(),
            outcome,
            detail,
        });
    }

    pub fn record_missing_player(&mut self, name: &str) {
        if !self.missing_players.iter().any(|n| n == name) {
            self.missing_players.push(name.to_string());
        }
    }

    pub fn total(&self) -> u32 {
        self.matched + self.created + self.updated + self.skipped + self.unmatched + self.failed
    }
}

/// Reconciler for one pass over scraped data
pub struct Reconciler<'a> {
    repo: &'a Repository,
    apply: bool,
    threshold: f64,
    /// Team resolution cache: (category, normalized label) → team id.
    /// Fixture plans repeat every team many times; resolve and report once.
    team_cache: HashMap<(String, String), Option<i64>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(repo: &'a Repository, apply: bool, threshold: f64) -> Self {
        Self {
            repo,
            apply,
            threshold,
            team_cache: HashMap::new(),
        }
    }

    fn dry_run_detail(&self) -> Option<String> {
        if self.apply {
            None
        } else {
            Some("dry run".to_string())
        }
    }

    // ==================== Teams and clubs ====================

    /// Resolve a scraped team label to a team row, creating club and team
    /// when nothing matches. Returns None in a dry run when the team does
    /// not exist yet, or when the label cannot be resolved at all.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_team(
        &mut self,
        raw_label: &str,
        season: &str,
        category: Option<&str>,
        league: Option<&str>,
        group_label: Option<&str>,
        team_table: Option<i64>,
        report: &mut SyncReport,
    ) -> Result<Option<i64>> {
        let label = split_team_label(raw_label);
        let cache_key = (
            category.unwrap_or("").to_string(),
            format!("{} {}", label.club, label.ordinal()),
        );
        if let Some(cached) = self.team_cache.get(&cache_key) {
            return Ok(*cached);
        }

        let resolved = self.resolve_team_uncached(
            raw_label, season, category, league, group_label, team_table, report,
        )?;
        self.team_cache.insert(cache_key, resolved);
        Ok(resolved)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_team_uncached(
        &mut self,
        raw_label: &str,
        season: &str,
        category: Option<&str>,
        league: Option<&str>,
        group_label: Option<&str>,
        team_table: Option<i64>,
        report: &mut SyncReport,
    ) -> Result<Option<i64>> {
        // A portal team-table id is authoritative
        if let Some(table_id) = team_table {
            if let Some(team_id) = self.repo.find_team_by_table(table_id)? {
                report.record("team", raw_label, Outcome::Matched, None);
                if self.apply {
                    self.repo.update_team(team_id, league, group_label, team_table)?;
                }
                return Ok(Some(team_id));
            }
        }

        let label = split_team_label(raw_label);
        if label.club.is_empty() {
            report.record(
                "team",
                raw_label,
                Outcome::Failed,
                Some("label has no club part".to_string()),
            );
            return Ok(None);
        }

        // Match against known teams of the season/category first
        let team_candidates = self.repo.team_candidates(season, category)?;
        let keys = candidate_keys(&label);
        match best_match(&keys, &team_candidates, self.threshold) {
            MatchOutcome::Matched { id, score, rule } => {
                report.record("team", raw_label, Outcome::Matched, rule_detail(rule, score));
                if self.apply {
                    self.repo.update_team(id, league, group_label, team_table)?;
                }
                return Ok(Some(id));
            }
            MatchOutcome::Unmatched { best } => {
                if let Some((id, score)) = best {
                    debug!(
                        "no team match for {:?}; best candidate {} scored {:.2}",
                        raw_label, id, score
                    );
                }
            }
        }

        // New team: resolve the club, then create
        let Some(club_id) = self.resolve_club(&label.club, raw_label, report)? else {
            report.record("team", raw_label, Outcome::Created, self.dry_run_detail());
            return Ok(None);
        };

        // The club may already field this team under a differently spelled
        // label; the unique key decides
        if let Some(team_id) = self
            .repo
            .find_team(club_id, label.ordinal(), category.unwrap_or(""), season)?
        {
            report.record("team", raw_label, Outcome::Matched, None);
            if self.apply {
                self.repo.update_team(team_id, league, group_label, team_table)?;
            }
            return Ok(Some(team_id));
        }

        if !self.apply {
            report.record("team", raw_label, Outcome::Created, self.dry_run_detail());
            return Ok(None);
        }

        let id = self.repo.insert_team(
            club_id,
            raw_label,
            label.ordinal(),
            category.unwrap_or(""),
            season,
            league,
            group_label,
            team_table,
        )?;
        report.record("team", raw_label, Outcome::Created, None);
        Ok(Some(id))
    }

    /// Resolve a club by normalized name, creating it when unmatched.
    fn resolve_club(
        &mut self,
        club_key: &str,
        display_label: &str,
        report: &mut SyncReport,
    ) -> Result<Option<i64>> {
        let candidates = self.repo.club_candidates()?;
        match best_match(&[club_key.to_string()], &candidates, self.threshold) {
            MatchOutcome::Matched { id, score, rule } => {
                report.record("club", display_label, Outcome::Matched, rule_detail(rule, score));
                Ok(Some(id))
            }
            MatchOutcome::Unmatched { best } => {
                let detail = match best {
                    Some((id, score)) => {
                        Some(format!("nearest club #{} scored {:.2}", id, score))
                    }
                    None => None,
                };
                if !self.apply {
                    report.record(
                        "club",
                        display_label,
                        Outcome::Created,
                        self.dry_run_detail().or(detail),
                    );
                    return Ok(None);
                }
                // Strip the team ordinal from the display label for the
                // club's display name
                let club_name = split_team_label(display_label);
                let name = if club_name.suffix.is_some() {
                    display_label
                        .rsplit_once(' ')
                        .map(|(head, _)| head)
                        .unwrap_or(display_label)
                } else {
                    display_label
                };
                let id = self.repo.insert_club(name.trim(), club_key, None, None)?;
                report.record("club", display_label, Outcome::Created, detail);
                Ok(Some(id))
            }
        }
    }

    /// Register a club learned from a search-results page or club page,
    /// where the portal number is known.
    pub fn reconcile_club(
        &mut self,
        name: &str,
        city: Option<&str>,
        club_number: Option<i64>,
        report: &mut SyncReport,
    ) -> Result<Option<i64>> {
        let key = normalize_name(name);

        if let Some(number) = club_number {
            if let Some(club) = self.repo.find_club_by_number(number)? {
                report.record("club", name, Outcome::Matched, None);
                return Ok(Some(club.id));
            }
        }

        let candidates = self.repo.club_candidates()?;
        match best_match(&[key.clone()], &candidates, self.threshold) {
            MatchOutcome::Matched { id, score, rule } => {
                let club = self.repo.get_club(id)?;
                let learns_number = club_number.is_some() && club.club_number.is_none();
                let learns_city = city.is_some() && club.city.is_none();
                if learns_number || learns_city {
                    if self.apply {
                        self.repo.update_club(id, city, club_number)?;
                    }
                    report.record("club", name, Outcome::Updated, self.dry_run_detail());
                } else {
                    let detail = if club.normalized_name != key {
                        Some(format!("stored as {:?}", club.name))
                    } else {
                        rule_detail(rule, score)
                    };
                    report.record("club", name, Outcome::Matched, detail);
                }
                Ok(Some(id))
            }
            MatchOutcome::Unmatched { .. } => {
                if !self.apply {
                    report.record("club", name, Outcome::Created, self.dry_run_detail());
                    return Ok(None);
                }
                let id = self.repo.insert_club(name, &key, city, club_number)?;
                report.record("club", name, Outcome::Created, None);
                Ok(Some(id))
            }
        }
    }

    // ==================== Fixtures ====================

    /// Reconcile one scraped fixture. Team labels are resolved through the
    /// cache; the fixture itself keys on (season, date, home, away).
    pub fn reconcile_fixture(
        &mut self,
        fixture: &ScrapedFixture,
        season: &str,
        category: Option<&str>,
        league: Option<&str>,
        group_label: Option<&str>,
        report: &mut SyncReport,
    ) -> Result<Option<i64>> {
        let fixture_label = format!("{} {} vs {}", fixture.date, fixture.home, fixture.away);
        // Per-row league labels (club pages) override the page-level one
        let league = fixture.league.as_deref().or(league);
        let category = fixture
            .league
            .as_deref()
            .and_then(crate::scraper::parsers::group::extract_category)
            .map_or_else(
                || category.map(str::to_string),
                Some,
            );
        let category = category.as_deref();

        let home_id =
            self.resolve_team(&fixture.home, season, category, league, group_label, None, report)?;
        let away_id =
            self.resolve_team(&fixture.away, season, category, league, group_label, None, report)?;

        let (Some(home_id), Some(away_id)) = (home_id, away_id) else {
            report.record(
                "fixture",
                fixture_label,
                Outcome::Skipped,
                Some(if self.apply {
                    "team unresolved".to_string()
                } else {
                    "dry run, teams not in database yet".to_string()
                }),
            );
            return Ok(None);
        };

        let record = FixtureRecord {
            season: season.to_string(),
            match_date: fixture.date,
            match_time: fixture.time.map(|t| t.format("%H:%M").to_string()),
            home_team_id: home_id,
            away_team_id: away_id,
            venue: fixture.venue.clone(),
            league: league.map(str::to_string),
            group_label: group_label.map(str::to_string),
            meeting_id: fixture.meeting_id,
            home_points: fixture.result.map(|r| r.0),
            away_points: fixture.result.map(|r| r.1),
        };

        match self.repo.find_fixture(season, fixture.date, home_id, away_id)? {
            Some(existing) => {
                if fixture_needs_update(&existing.record, &record) {
                    if self.apply {
                        self.repo.update_fixture(existing.id, &record)?;
                    }
                    report.record("fixture", fixture_label, Outcome::Updated, self.dry_run_detail());
                } else {
                    report.record("fixture", fixture_label, Outcome::Skipped, None);
                }
                Ok(Some(existing.id))
            }
            None => {
                if !self.apply {
                    report.record("fixture", fixture_label, Outcome::Created, self.dry_run_detail());
                    return Ok(None);
                }
                let id = self.repo.insert_fixture(&record)?;
                report.record("fixture", fixture_label, Outcome::Created, None);
                Ok(Some(id))
            }
        }
    }

    // ==================== Standings ====================

    pub fn reconcile_standing(
        &mut self,
        row: &StandingRow,
        team_id: i64,
        season: &str,
        group_label: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let record = StandingRecord {
            season: season.to_string(),
            group_label: group_label.to_string(),
            team_id,
            rank: row.rank,
            played: row.played,
            match_points: row.match_points,
            table_points: row.table_points,
        };

        let label = format!("{} #{}", row.team, row.rank);
        match self.repo.find_standing(season, group_label, team_id)? {
            Some(existing) if existing == record => {
                report.record("standing", label, Outcome::Skipped, None);
            }
            Some(_) => {
                if self.apply {
                    self.repo.upsert_standing(&record)?;
                }
                report.record("standing", label, Outcome::Updated, self.dry_run_detail());
            }
            None => {
                if self.apply {
                    self.repo.upsert_standing(&record)?;
                }
                report.record("standing", label, Outcome::Created, self.dry_run_detail());
            }
        }
        Ok(())
    }

    // ==================== Rosters ====================

    /// Reconcile a team roster. Portal person ids are authoritative; names
    /// only create new rows when nothing matches.
    pub fn reconcile_roster(
        &mut self,
        team_id: i64,
        players: &[ScrapedPlayer],
        report: &mut SyncReport,
    ) -> Result<()> {
        for player in players {
            let key = normalize_player_name(&player.name);

            // 1. Portal id
            if let Some(person_id) = player.person_id {
                if let Some(existing) = self.repo.find_player_by_person(person_id)? {
                    let changed = (player.lk_rating.is_some()
                        && existing.lk_rating != player.lk_rating)
                        || existing.team_id != Some(team_id)
                        || existing.position != Some(player.position);
                    if changed {
                        if self.apply {
                            self.repo.update_player(
                                existing.id,
                                None,
                                player.lk_rating,
                                Some(team_id),
                                Some(player.position),
                            )?;
                        }
                        report.record("player", player.name.as_str(), Outcome::Updated, self.dry_run_detail());
                    } else {
                        report.record("player", player.name.as_str(), Outcome::Skipped, None);
                    }
                    continue;
                }
            }

            // 2. Name match among stored players
            let candidates = self.repo.player_candidates(None)?;
            match best_match(&[key.clone()], &candidates, self.threshold) {
                MatchOutcome::Matched { id, score, rule } => {
                    let existing = self.repo.get_player(id)?;
                    let changed = (player.person_id.is_some() && existing.person_id.is_none())
                        || (player.lk_rating.is_some() && existing.lk_rating != player.lk_rating)
                        || existing.team_id != Some(team_id)
                        || existing.position != Some(player.position);
                    if changed {
                        if self.apply {
                            self.repo.update_player(
                                id,
                                player.person_id,
                                player.lk_rating,
                                Some(team_id),
                                Some(player.position),
                            )?;
                        }
                        report.record("player", player.name.as_str(), Outcome::Updated, self.dry_run_detail());
                    } else {
                        let detail = rule_detail(rule, score)
                            .map(|d| format!("{} on stored {:?}", d, existing.name));
                        report.record("player", player.name.as_str(), Outcome::Matched, detail);
                    }
                }
                MatchOutcome::Unmatched { .. } => {
                    if self.apply {
                        self.repo.insert_player(
                            &player.name,
                            &key,
                            player.person_id,
                            player.lk_rating,
                            Some(team_id),
                            Some(player.position),
                        )?;
                    }
                    report.record("player", player.name.as_str(), Outcome::Created, self.dry_run_detail());
                }
            }
        }
        Ok(())
    }

    // ==================== Result lines ====================

    /// Reconcile the result lines of a meeting into an existing fixture.
    /// Lines are insert-only: an existing (fixture, line) row is never
    /// touched. Unmatched player names land in the missing-players list
    /// instead of failing the meeting.
    pub fn reconcile_meeting_lines(
        &mut self,
        fixture_id: i64,
        home_team_id: i64,
        away_team_id: i64,
        meeting: &MeetingReport,
        report: &mut SyncReport,
    ) -> Result<()> {
        for line in &meeting.lines {
            let label = format!(
                "{} - {} line {}",
                meeting.home_team, meeting.away_team, line.line_no
            );

            if self.repo.line_exists(fixture_id, line.line_no)? {
                report.record("line", label, Outcome::Skipped, None);
                continue;
            }

            let home_ids = self.resolve_line_players(home_team_id, &line.home_players, report);
            let away_ids = self.resolve_line_players(away_team_id, &line.away_players, report);
            let (home_sets, away_sets) = line.sets_won();

            if !self.apply {
                report.record("line", label, Outcome::Created, self.dry_run_detail());
                continue;
            }

            let record = LineRecord {
                fixture_id,
                line_no: line.line_no,
                line_type: line.kind.as_str().to_string(),
                home_player_id: home_ids.first().copied().flatten(),
                home_partner_id: home_ids.get(1).copied().flatten(),
                away_player_id: away_ids.first().copied().flatten(),
                away_partner_id: away_ids.get(1).copied().flatten(),
                set_scores: Some(line.set_scores()).filter(|s| !s.is_empty()),
                home_sets,
                away_sets,
            };
            match self.repo.insert_line(&record) {
                Ok(_) => report.record("line", label, Outcome::Created, None),
                Err(e) => {
                    // A conflicting write aborts this line, not the meeting
                    warn!("failed to insert {}: {}", label, e);
                    report.record("line", label, Outcome::Failed, Some(e.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Match the players of one line side against the team's stored roster,
    /// falling back to the full player table for substitutes from lower
    /// teams. Misses are recorded, never guessed.
    fn resolve_line_players(
        &mut self,
        team_id: i64,
        names: &[String],
        report: &mut SyncReport,
    ) -> Vec<Option<i64>> {
        names
            .iter()
            .map(|name| {
                let key = normalize_player_name(name);
                let keys = [key];

                let team_candidates = match self.repo.player_candidates(Some(team_id)) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("player candidate query failed: {}", e);
                        return None;
                    }
                };
                if let Some(id) = best_match(&keys, &team_candidates, self.threshold).matched_id() {
                    return Some(id);
                }

                let all_candidates = self.repo.player_candidates(None).ok()?;
                match best_match(&keys, &all_candidates, self.threshold) {
                    MatchOutcome::Matched { id, .. } => Some(id),
                    MatchOutcome::Unmatched { best } => {
                        if let Some((id, score)) = best {
                            debug!("no player match for {:?}; best {} at {:.2}", name, id, score);
                        }
                        report.record_missing_player(name);
                        None
                    }
                }
            })
            .collect()
    }
}

fn rule_detail(rule: MatchRule, score: f64) -> Option<String> {
    match rule {
        MatchRule::Exact => None,
        MatchRule::Substring => Some("substring match".to_string()),
        MatchRule::Bigram => Some(format!("bigram match {:.2}", score)),
    }
}

/// Whether an incoming fixture record carries anything the stored row lacks
/// or contradicts.
fn fixture_needs_update(existing: &FixtureRecord, incoming: &FixtureRecord) -> bool {
    fn differs<T: PartialEq>(old: &Option<T>, new: &Option<T>) -> bool {
        new.is_some() && old != new
    }

    differs(&existing.match_time, &incoming.match_time)
        || differs(&existing.venue, &incoming.venue)
        || differs(&existing.league, &incoming.league)
        || differs(&existing.group_label, &incoming.group_label)
        || differs(&existing.meeting_id, &incoming.meeting_id)
        || differs(&existing.home_points, &incoming.home_points)
        || differs(&existing.away_points, &incoming.away_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    const THRESHOLD: f64 = 0.7;

    fn scraped_fixture(date: (i32, u32, u32), home: &str, away: &str) -> ScrapedFixture {
        ScrapedFixture {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0),
            home: home.to_string(),
            away: away.to_string(),
            venue: None,
            meeting_id: None,
            result: None,
            league: None,
        }
    }

    fn reconcile_once(repo: &Repository, fixture: &ScrapedFixture) -> SyncReport {
        let mut report = SyncReport::default();
        let mut reconciler = Reconciler::new(repo, true, THRESHOLD);
        reconciler
            .reconcile_fixture(
                fixture,
                "Sommer 2026",
                Some("Herren 30"),
                Some("2. Bezirksliga"),
                Some("035"),
                &mut report,
            )
            .unwrap();
        report
    }

    #[test]
    fn test_first_pass_creates_everything() {
        let repo = Repository::in_memory().unwrap();
        let fixture = scraped_fixture((2025, 11, 15), "SV Sürth 1", "TC Köln-Süd 2");

        let report = reconcile_once(&repo, &fixture);
        // Two clubs, two teams, one fixture
        assert_eq!(report.created, 5);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let repo = Repository::in_memory().unwrap();
        let fixture = scraped_fixture((2025, 11, 15), "SV Sürth 1", "TC Köln-Süd 2");

        reconcile_once(&repo, &fixture);
        let second = reconcile_once(&repo, &fixture);

        assert_eq!(second.created, 0);
        // Teams match, fixture already up to date
        assert_eq!(second.matched, 2);
        assert_eq!(second.skipped, 1);

        let counts = repo.table_counts().unwrap();
        let fixtures = counts.iter().find(|(t, _)| t == "fixtures").unwrap();
        assert_eq!(fixtures.1, 1);
    }

    #[test]
    fn test_result_arrival_updates_fixture() {
        let repo = Repository::in_memory().unwrap();
        let mut fixture = scraped_fixture((2025, 11, 15), "SV Sürth 1", "TC Köln-Süd 2");
        reconcile_once(&repo, &fixture);

        fixture.result = Some((9, 0));
        fixture.meeting_id = Some(7250341);
        let report = reconcile_once(&repo, &fixture);

        assert_eq!(report.updated, 1);
        let row = repo.find_fixture_by_meeting(7250341).unwrap().unwrap();
        assert_eq!(row.record.home_points, Some(9));
    }

    #[test]
    fn test_spelling_variant_does_not_duplicate() {
        let repo = Repository::in_memory().unwrap();
        reconcile_once(&repo, &scraped_fixture((2025, 11, 15), "SV Sürth 1", "TC Köln-Süd 2"));
        // Same fixture, umlauts transcribed and Roman ordinal
        reconcile_once(
            &repo,
            &scraped_fixture((2025, 11, 15), "SV Suerth I", "TC Koeln-Sued II"),
        );

        let counts = repo.table_counts().unwrap();
        let clubs = counts.iter().find(|(t, _)| t == "clubs").unwrap();
        let fixtures = counts.iter().find(|(t, _)| t == "fixtures").unwrap();
        assert_eq!(clubs.1, 2);
        assert_eq!(fixtures.1, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let repo = Repository::in_memory().unwrap();
        let fixture = scraped_fixture((2025, 11, 15), "SV Sürth 1", "TC Köln-Süd 2");

        let mut report = SyncReport::default();
        let mut reconciler = Reconciler::new(&repo, false, THRESHOLD);
        reconciler
            .reconcile_fixture(&fixture, "Sommer 2026", None, None, None, &mut report)
            .unwrap();

        assert!(report.created > 0);
        for (_, count) in repo.table_counts().unwrap() {
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn test_standing_reconcile_transitions() {
        let repo = Repository::in_memory().unwrap();
        let mut report = SyncReport::default();
        let mut reconciler = Reconciler::new(&repo, true, THRESHOLD);

        let team_id = reconciler
            .resolve_team(
                "SV Sürth 1",
                "Sommer 2026",
                Some("Herren 30"),
                None,
                None,
                None,
                &mut report,
            )
            .unwrap()
            .unwrap();

        let mut row = StandingRow {
            rank: 2,
            team: "SV Sürth 1".to_string(),
            played: 6,
            match_points: Some((40, 14)),
            table_points: Some((10, 2)),
            team_table: None,
        };

        reconciler
            .reconcile_standing(&row, team_id, "Sommer 2026", "035", &mut report)
            .unwrap();
        // Unchanged snapshot skips
        reconciler
            .reconcile_standing(&row, team_id, "Sommer 2026", "035", &mut report)
            .unwrap();
        // Moved up a rank
        row.rank = 1;
        row.played = 7;
        reconciler
            .reconcile_standing(&row, team_id, "Sommer 2026", "035", &mut report)
            .unwrap();

        let standing = repo.find_standing("Sommer 2026", "035", team_id).unwrap().unwrap();
        assert_eq!(standing.rank, 1);

        let outcomes: Vec<Outcome> = report
            .items
            .iter()
            .filter(|i| i.entity == "standing")
            .map(|i| i.outcome)
            .collect();
        assert_eq!(outcomes, vec![Outcome::Created, Outcome::Skipped, Outcome::Updated]);
    }

    #[test]
    fn test_roster_updates_lk_by_person_id() {
        let repo = Repository::in_memory().unwrap();
        let mut report = SyncReport::default();
        let mut reconciler = Reconciler::new(&repo, true, THRESHOLD);
        let team_id = reconciler
            .resolve_team("SV Sürth 1", "Sommer 2026", None, None, None, None, &mut report)
            .unwrap()
            .unwrap();

        let mut players = vec![ScrapedPlayer {
            position: 1,
            name: "Müller, Hans".to_string(),
            lk_rating: Some(8.5),
            person_id: Some(987654),
        }];
        reconciler.reconcile_roster(team_id, &players, &mut report).unwrap();

        players[0].lk_rating = Some(7.9);
        reconciler.reconcile_roster(team_id, &players, &mut report).unwrap();

        let player = repo.find_player_by_person(987654).unwrap().unwrap();
        assert_eq!(player.lk_rating, Some(7.9));

        let counts = repo.table_counts().unwrap();
        let players_count = counts.iter().find(|(t, _)| t == "players").unwrap();
        assert_eq!(players_count.1, 1);
    }

    #[test]
    fn test_meeting_lines_with_missing_player() {
        let repo = Repository::in_memory().unwrap();
        let mut report = SyncReport::default();
        let mut reconciler = Reconciler::new(&repo, true, THRESHOLD);

        let home_id = reconciler
            .resolve_team("SV Sürth 1", "S", None, None, None, None, &mut report)
            .unwrap()
            .unwrap();
        let away_id = reconciler
            .resolve_team("TC Köln-Süd 2", "S", None, None, None, None, &mut report)
            .unwrap()
            .unwrap();

        repo.insert_player("Müller, Hans", "mueller hans", None, None, Some(home_id), Some(1))
            .unwrap();

        let fixture_id = repo
            .insert_fixture(&FixtureRecord {
                season: "S".to_string(),
                match_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
                match_time: None,
                home_team_id: home_id,
                away_team_id: away_id,
                venue: None,
                league: None,
                group_label: None,
                meeting_id: Some(7250341),
                home_points: None,
                away_points: None,
            })
            .unwrap();

        let meeting = MeetingReport {
            home_team: "SV Sürth 1".to_string(),
            away_team: "TC Köln-Süd 2".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 15),
            score: Some((6, 0)),
            lines: vec![crate::scraper::parsers::meeting::ScrapedLine {
                line_no: 1,
                kind: crate::scraper::parsers::meeting::LineKind::Singles,
                home_players: vec!["Müller, H.".to_string()],
                away_players: vec!["Schmidt, P.".to_string()],
                sets: vec![(6, 3), (6, 4)],
            }],
        };

        reconciler
            .reconcile_meeting_lines(fixture_id, home_id, away_id, &meeting, &mut report)
            .unwrap();

        // The abbreviated home name matched the roster, the unknown away
        // player is reported missing
        assert_eq!(report.missing_players, vec!["Schmidt, P.".to_string()]);
        assert_eq!(repo.count_lines(fixture_id).unwrap(), 1);

        // Second pass skips the existing line and reports nothing new
        let mut second = SyncReport::default();
        reconciler
            .reconcile_meeting_lines(fixture_id, home_id, away_id, &meeting, &mut second)
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(repo.count_lines(fixture_id).unwrap(), 1);
    }
}
