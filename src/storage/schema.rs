//! SQLite schema definitions for reconciled league data
//!
//! Tables:
//! - clubs: one row per real-world club
//! - teams: a club's team in a category and season
//! - players: roster members with portal ids and LK ratings
//! - fixtures: scheduled/played team matches
//! - fixture_lines: per-rubber results of a played fixture
//! - standings: current group table snapshot per team
//!
//! The UNIQUE constraints mirror the reconciliation keys; the reconciler
//! relies on them as a last line of defense against duplicates.

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS clubs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL UNIQUE,
            city TEXT,
            club_number INTEGER UNIQUE,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            club_id INTEGER NOT NULL REFERENCES clubs(id),
            label TEXT NOT NULL,
            ordinal INTEGER NOT NULL DEFAULT 1,
            category TEXT NOT NULL DEFAULT '',
            season TEXT NOT NULL,
            league TEXT,
            group_label TEXT,
            team_table INTEGER,
            UNIQUE(club_id, ordinal, category, season)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            person_id INTEGER UNIQUE,
            lk_rating REAL,
            team_id INTEGER REFERENCES teams(id),
            position INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS fixtures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season TEXT NOT NULL,
            match_date TEXT NOT NULL,
            match_time TEXT,
            home_team_id INTEGER NOT NULL REFERENCES teams(id),
            away_team_id INTEGER NOT NULL REFERENCES teams(id),
            venue TEXT,
            league TEXT,
            group_label TEXT,
            meeting_id INTEGER,
            home_points INTEGER,
            away_points INTEGER,
            UNIQUE(season, match_date, home_team_id, away_team_id)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS fixture_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fixture_id INTEGER NOT NULL REFERENCES fixtures(id),
            line_no INTEGER NOT NULL,
            line_type TEXT NOT NULL,
            home_player_id INTEGER REFERENCES players(id),
            home_partner_id INTEGER REFERENCES players(id),
            away_player_id INTEGER REFERENCES players(id),
            away_partner_id INTEGER REFERENCES players(id),
            set_scores TEXT,
            home_sets INTEGER,
            away_sets INTEGER,
            UNIQUE(fixture_id, line_no)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS standings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season TEXT NOT NULL,
            group_label TEXT NOT NULL,
            team_id INTEGER NOT NULL REFERENCES teams(id),
            rank INTEGER NOT NULL,
            played INTEGER NOT NULL DEFAULT 0,
            match_points_for INTEGER,
            match_points_against INTEGER,
            table_points_for INTEGER,
            table_points_against INTEGER,
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(season, group_label, team_id)
        )
        "#,
        [],
    )?;

    // Indexes for the common lookups
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_teams_season ON teams(season, category)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_players_name ON players(normalized_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fixtures_meeting ON fixtures(meeting_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fixtures_season ON fixtures(season, match_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lines_fixture ON fixture_lines(fixture_id)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('clubs', 'teams', 'players', 'fixtures', 'fixture_lines', 'standings')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_create_tables_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // Should not fail on second call
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_fixture_unique_key() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        conn.execute(
            "INSERT INTO clubs (name, normalized_name) VALUES ('A', 'a'), ('B', 'b')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO teams (club_id, label, season) VALUES (1, 'A', 'S'), (2, 'B', 'S')",
            [],
        )
        .unwrap();

        let insert = "INSERT INTO fixtures (season, match_date, home_team_id, away_team_id)
                      VALUES ('S', '2025-11-15', 1, 2)";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }
}
