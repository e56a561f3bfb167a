//! Database schema migrations for cycletrack.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(tx: &Connection, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: episodes, date entries and profiles.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS episodes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id  INTEGER NOT NULL,
            started_at  TEXT NOT NULL,
            last_date   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS date_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            episode_id  INTEGER NOT NULL REFERENCES episodes(id) ON DELETE CASCADE,
            date        TEXT NOT NULL,
            UNIQUE (episode_id, date)
        );

        CREATE TABLE IF NOT EXISTS profiles (
            subject_id                  INTEGER PRIMARY KEY,
            menstrual_cycle_duration    INTEGER,
            is_menstrual_cycle_regular  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_episodes_subject_started ON episodes(subject_id, started_at);
        CREATE INDEX IF NOT EXISTS idx_date_entries_episode ON date_entries(episode_id);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: seed date on profiles.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_initial_period_date: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('profiles') WHERE name = 'initial_period_date'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_initial_period_date {
        tx.execute_batch("ALTER TABLE profiles ADD COLUMN initial_period_date TEXT;")?;
    }

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        conn.execute(
            "INSERT INTO profiles (subject_id, initial_period_date) VALUES (1, '2024-07-20')",
            [],
        )
        .unwrap();
        let seed: Option<String> = conn
            .query_row(
                "SELECT initial_period_date FROM profiles WHERE subject_id = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(seed.as_deref(), Some("2024-07-20"));
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    /// v1 databases gain the seed column without losing profiles.
    #[test]
    fn test_incremental_migration() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO profiles (subject_id, menstrual_cycle_duration) VALUES (5, 30)",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), 2);
        let (duration, seed): (Option<i64>, Option<String>) = conn
            .query_row(
                "SELECT menstrual_cycle_duration, initial_period_date FROM profiles WHERE subject_id = 5",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(duration, Some(30));
        assert_eq!(seed, None);
    }

    #[test]
    fn test_duplicate_entry_rejected_by_schema() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO episodes (subject_id, started_at, last_date) VALUES (1, '2024-07-20', '2024-07-20')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO date_entries (episode_id, date) VALUES (1, '2024-07-20')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO date_entries (episode_id, date) VALUES (1, '2024-07-20')",
            [],
        );
        assert!(dup.is_err());
    }
}
