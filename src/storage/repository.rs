//! SQLite repository for CRUD operations on reconciled league data

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::schema::create_tables;
use crate::matcher::Candidate;

/// A stored club
#[derive(Debug, Clone)]
pub struct ClubRow {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub city: Option<String>,
    pub club_number: Option<i64>,
}

/// A stored player
#[derive(Debug, Clone)]
pub struct PlayerRow {
    pub id: i64,
    pub name: String,
    pub person_id: Option<i64>,
    pub lk_rating: Option<f64>,
    pub team_id: Option<i64>,
    pub position: Option<u32>,
}

/// Fixture fields as written by the reconciler (no row id)
#[derive(Debug, Clone)]
pub struct FixtureRecord {
    pub season: String,
    pub match_date: NaiveDate,
    pub match_time: Option<String>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub venue: Option<String>,
    pub league: Option<String>,
    pub group_label: Option<String>,
    pub meeting_id: Option<i64>,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
}

/// A stored fixture
#[derive(Debug, Clone)]
pub struct FixtureRow {
    pub id: i64,
    pub record: FixtureRecord,
}

/// One result line as written by the reconciler
#[derive(Debug, Clone)]
pub struct LineRecord {
    pub fixture_id: i64,
    pub line_no: u32,
    pub line_type: String,
    pub home_player_id: Option<i64>,
    pub home_partner_id: Option<i64>,
    pub away_player_id: Option<i64>,
    pub away_partner_id: Option<i64>,
    pub set_scores: Option<String>,
    pub home_sets: u32,
    pub away_sets: u32,
}

/// A standings snapshot row as written by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingRecord {
    pub season: String,
    pub group_label: String,
    pub team_id: i64,
    pub rank: u32,
    pub played: u32,
    pub match_points: Option<(u32, u32)>,
    pub table_points: Option<(u32, u32)>,
}

/// Repository for reconciled league data
pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Open a repository, initializing the database if needed
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    // ==================== Clubs ====================

    pub fn insert_club(
        &self,
        name: &str,
        normalized_name: &str,
        city: Option<&str>,
        club_number: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO clubs (name, normalized_name, city, club_number) VALUES (?1, ?2, ?3, ?4)",
            params![name, normalized_name, city, club_number],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fill in a club number or city learned from a later scrape. Existing
    /// values are never overwritten with NULL.
    pub fn update_club(&self, id: i64, city: Option<&str>, club_number: Option<i64>) -> Result<()> {
        self.conn.execute(
            "UPDATE clubs SET city = COALESCE(?2, city), club_number = COALESCE(?3, club_number)
             WHERE id = ?1",
            params![id, city, club_number],
        )?;
        Ok(())
    }

    pub fn get_club(&self, id: i64) -> Result<ClubRow> {
        let row = self.conn.query_row(
            "SELECT id, name, normalized_name, city, club_number FROM clubs WHERE id = ?1",
            [id],
            map_club,
        )?;
        Ok(row)
    }

    pub fn find_club_by_number(&self, club_number: i64) -> Result<Option<ClubRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, normalized_name, city, club_number FROM clubs WHERE club_number = ?1",
                [club_number],
                map_club,
            )
            .optional()?;
        Ok(row)
    }

    /// All clubs as matcher candidates, keyed by normalized name.
    pub fn club_candidates(&self) -> Result<Vec<Candidate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, normalized_name, club_number IS NOT NULL FROM clubs")?;
        let candidates = stmt
            .query_map([], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    has_external_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    // ==================== Teams ====================

    #[allow(clippy::too_many_arguments)]
    pub fn insert_team(
        &self,
        club_id: i64,
        label: &str,
        ordinal: u32,
        category: &str,
        season: &str,
        league: Option<&str>,
        group_label: Option<&str>,
        team_table: Option<i64>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO teams (club_id, label, ordinal, category, season, league, group_label, team_table)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![club_id, label, ordinal, category, season, league, group_label, team_table],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update league metadata on a team without ever clearing known values.
    pub fn update_team(
        &self,
        id: i64,
        league: Option<&str>,
        group_label: Option<&str>,
        team_table: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE teams SET league = COALESCE(?2, league),
                              group_label = COALESCE(?3, group_label),
                              team_table = COALESCE(?4, team_table)
             WHERE id = ?1",
            params![id, league, group_label, team_table],
        )?;
        Ok(())
    }

    pub fn find_team(
        &self,
        club_id: i64,
        ordinal: u32,
        category: &str,
        season: &str,
    ) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM teams
                 WHERE club_id = ?1 AND ordinal = ?2 AND category = ?3 AND season = ?4",
                params![club_id, ordinal, category, season],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn find_team_by_table(&self, team_table: i64) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM teams WHERE team_table = ?1",
                [team_table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Teams of a season as matcher candidates, keyed by the club's
    /// normalized name plus the team ordinal ("tc koeln sued 2").
    pub fn team_candidates(&self, season: &str, category: Option<&str>) -> Result<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, c.normalized_name || ' ' || t.ordinal, t.team_table IS NOT NULL
             FROM teams t JOIN clubs c ON c.id = t.club_id
             WHERE t.season = ?1 AND (?2 IS NULL OR t.category = ?2)",
        )?;
        let candidates = stmt
            .query_map(params![season, category], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    has_external_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    // ==================== Players ====================

    #[allow(clippy::too_many_arguments)]
    pub fn insert_player(
        &self,
        name: &str,
        normalized_name: &str,
        person_id: Option<i64>,
        lk_rating: Option<f64>,
        team_id: Option<i64>,
        position: Option<u32>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO players (name, normalized_name, person_id, lk_rating, team_id, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![name, normalized_name, person_id, lk_rating, team_id, position],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_player(
        &self,
        id: i64,
        person_id: Option<i64>,
        lk_rating: Option<f64>,
        team_id: Option<i64>,
        position: Option<u32>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE players SET person_id = COALESCE(?2, person_id),
                                lk_rating = COALESCE(?3, lk_rating),
                                team_id = COALESCE(?4, team_id),
                                position = COALESCE(?5, position)
             WHERE id = ?1",
            params![id, person_id, lk_rating, team_id, position],
        )?;
        Ok(())
    }

    pub fn get_player(&self, id: i64) -> Result<PlayerRow> {
        let row = self.conn.query_row(
            "SELECT id, name, person_id, lk_rating, team_id, position
             FROM players WHERE id = ?1",
            [id],
            map_player,
        )?;
        Ok(row)
    }

    pub fn find_player_by_person(&self, person_id: i64) -> Result<Option<PlayerRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, person_id, lk_rating, team_id, position
                 FROM players WHERE person_id = ?1",
                [person_id],
                map_player,
            )
            .optional()?;
        Ok(row)
    }

    /// Players as matcher candidates, optionally restricted to one team.
    pub fn player_candidates(&self, team_id: Option<i64>) -> Result<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, normalized_name, person_id IS NOT NULL FROM players
             WHERE ?1 IS NULL OR team_id = ?1",
        )?;
        let candidates = stmt
            .query_map(params![team_id], |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    has_external_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    // ==================== Fixtures ====================

    pub fn insert_fixture(&self, record: &FixtureRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO fixtures (season, match_date, match_time, home_team_id, away_team_id,
                                   venue, league, group_label, meeting_id, home_points, away_points)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.season,
                record.match_date.to_string(),
                record.match_time,
                record.home_team_id,
                record.away_team_id,
                record.venue,
                record.league,
                record.group_label,
                record.meeting_id,
                record.home_points,
                record.away_points,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update the mutable parts of a fixture: time, venue, meeting link,
    /// and result. The identity key never changes.
    pub fn update_fixture(&self, id: i64, record: &FixtureRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE fixtures SET match_time = COALESCE(?2, match_time),
                                 venue = COALESCE(?3, venue),
                                 league = COALESCE(?4, league),
                                 group_label = COALESCE(?5, group_label),
                                 meeting_id = COALESCE(?6, meeting_id),
                                 home_points = COALESCE(?7, home_points),
                                 away_points = COALESCE(?8, away_points)
             WHERE id = ?1",
            params![
                id,
                record.match_time,
                record.venue,
                record.league,
                record.group_label,
                record.meeting_id,
                record.home_points,
                record.away_points,
            ],
        )?;
        Ok(())
    }

    pub fn find_fixture(
        &self,
        season: &str,
        match_date: NaiveDate,
        home_team_id: i64,
        away_team_id: i64,
    ) -> Result<Option<FixtureRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, season, match_date, match_time, home_team_id, away_team_id,
                        venue, league, group_label, meeting_id, home_points, away_points
                 FROM fixtures
                 WHERE season = ?1 AND match_date = ?2 AND home_team_id = ?3 AND away_team_id = ?4",
                params![season, match_date.to_string(), home_team_id, away_team_id],
                map_fixture,
            )
            .optional()?;
        Ok(row)
    }

    pub fn get_fixture(&self, id: i64) -> Result<FixtureRow> {
        let row = self.conn.query_row(
            "SELECT id, season, match_date, match_time, home_team_id, away_team_id,
                    venue, league, group_label, meeting_id, home_points, away_points
             FROM fixtures WHERE id = ?1",
            [id],
            map_fixture,
        )?;
        Ok(row)
    }

    pub fn find_fixture_by_meeting(&self, meeting_id: i64) -> Result<Option<FixtureRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, season, match_date, match_time, home_team_id, away_team_id,
                        venue, league, group_label, meeting_id, home_points, away_points
                 FROM fixtures WHERE meeting_id = ?1",
                [meeting_id],
                map_fixture,
            )
            .optional()?;
        Ok(row)
    }

    // ==================== Result lines ====================

    pub fn line_exists(&self, fixture_id: i64, line_no: u32) -> Result<bool> {
        let count: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM fixture_lines WHERE fixture_id = ?1 AND line_no = ?2",
            params![fixture_id, line_no],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_line(&self, line: &LineRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO fixture_lines (fixture_id, line_no, line_type, home_player_id,
                                        home_partner_id, away_player_id, away_partner_id,
                                        set_scores, home_sets, away_sets)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                line.fixture_id,
                line.line_no,
                line.line_type,
                line.home_player_id,
                line.home_partner_id,
                line.away_player_id,
                line.away_partner_id,
                line.set_scores,
                line.home_sets,
                line.away_sets,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_lines(&self, fixture_id: i64) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM fixture_lines WHERE fixture_id = ?1",
            [fixture_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==================== Standings ====================

    pub fn find_standing(
        &self,
        season: &str,
        group_label: &str,
        team_id: i64,
    ) -> Result<Option<StandingRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT season, group_label, team_id, rank, played,
                        match_points_for, match_points_against,
                        table_points_for, table_points_against
                 FROM standings WHERE season = ?1 AND group_label = ?2 AND team_id = ?3",
                params![season, group_label, team_id],
                map_standing,
            )
            .optional()?;
        Ok(row)
    }

    pub fn upsert_standing(&self, record: &StandingRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO standings (season, group_label, team_id, rank, played,
                                    match_points_for, match_points_against,
                                    table_points_for, table_points_against, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
             ON CONFLICT(season, group_label, team_id) DO UPDATE SET
                 rank = excluded.rank,
                 played = excluded.played,
                 match_points_for = excluded.match_points_for,
                 match_points_against = excluded.match_points_against,
                 table_points_for = excluded.table_points_for,
                 table_points_against = excluded.table_points_against,
                 updated_at = excluded.updated_at",
            params![
                record.season,
                record.group_label,
                record.team_id,
                record.rank,
                record.played,
                record.match_points.map(|p| p.0),
                record.match_points.map(|p| p.1),
                record.table_points.map(|p| p.0),
                record.table_points.map(|p| p.1),
            ],
        )?;
        Ok(())
    }

    // ==================== Counts ====================

    /// Row counts per table for the `stats` command.
    pub fn table_counts(&self) -> Result<Vec<(String, i64)>> {
        let tables = [
            "clubs",
            "teams",
            "players",
            "fixtures",
            "fixture_lines",
            "standings",
        ];
        let mut counts = Vec::new();
        for table in tables {
            let count: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
            counts.push((table.to_string(), count));
        }
        Ok(counts)
    }
}

fn map_club(row: &rusqlite::Row) -> rusqlite::Result<ClubRow> {
    Ok(ClubRow {
        id: row.get(0)?,
        name: row.get(1)?,
        normalized_name: row.get(2)?,
        city: row.get(3)?,
        club_number: row.get(4)?,
    })
}

fn map_player(row: &rusqlite::Row) -> rusqlite::Result<PlayerRow> {
    Ok(PlayerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        person_id: row.get(2)?,
        lk_rating: row.get(3)?,
        team_id: row.get(4)?,
        position: row.get(5)?,
    })
}

fn map_fixture(row: &rusqlite::Row) -> rusqlite::Result<FixtureRow> {
    let date_str: String = row.get(2)?;
    let match_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());

    Ok(FixtureRow {
        id: row.get(0)?,
        record: FixtureRecord {
            season: row.get(1)?,
            match_date,
            match_time: row.get(3)?,
            home_team_id: row.get(4)?,
            away_team_id: row.get(5)?,
            venue: row.get(6)?,
            league: row.get(7)?,
            group_label: row.get(8)?,
            meeting_id: row.get(9)?,
            home_points: row.get(10)?,
            away_points: row.get(11)?,
        },
    })
}

fn map_standing(row: &rusqlite::Row) -> rusqlite::Result<StandingRecord> {
    let mpf: Option<u32> = row.get(5)?;
    let mpa: Option<u32> = row.get(6)?;
    let tpf: Option<u32> = row.get(7)?;
    let tpa: Option<u32> = row.get(8)?;
    Ok(StandingRecord {
        season: row.get(0)?,
        group_label: row.get(1)?,
        team_id: row.get(2)?,
        rank: row.get(3)?,
        played: row.get(4)?,
        match_points: mpf.zip(mpa),
        table_points: tpf.zip(tpa),
    })
}
