//! SQLite-backed store for episodes, date entries and profiles.
//!
//! Dates are stored as `YYYY-MM-DD` text so lexical order matches
//! calendar order.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::{data_dir, migrations};
use crate::episode::{DateEntry, DateEntryId, Episode, EpisodeId, SubjectId};
use crate::error::{DatabaseError, Result};
use crate::profile::Profile;
use crate::store::{DateEntryStore, EpisodeStore, ProfileReader, ProfileWriter, Store};

const DATE_FORMAT: &str = "%Y-%m-%d";
const EPISODE_COLUMNS: &str = "id, subject_id, started_at, last_date";

// === Helper Functions ===

/// Format a date for database storage
fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date, reporting the offending column on failure
fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        started_at: parse_date(row, 2)?,
        last_date: parse_date(row, 3)?,
    })
}

fn row_to_date_entry(row: &rusqlite::Row) -> rusqlite::Result<DateEntry> {
    Ok(DateEntry {
        id: row.get(0)?,
        episode_id: row.get(1)?,
        date: parse_date(row, 2)?,
    })
}

/// SQLite database holding every subject's tracking data.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/cycletrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("cycletrack.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn query_episode(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Episode>> {
        Ok(self
            .conn
            .query_row(sql, params, row_to_episode)
            .optional()?)
    }
}

impl EpisodeStore for Database {
    fn episodes_for_subject(&self, subject: SubjectId) -> Result<Vec<Episode>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes
             WHERE subject_id = ?1
             ORDER BY started_at DESC, id DESC"
        ))?;
        let episodes = stmt
            .query_map(params![subject], row_to_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    fn recent_episodes(&self, subject: SubjectId, limit: usize) -> Result<Vec<Episode>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes
             WHERE subject_id = ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2"
        ))?;
        let episodes = stmt
            .query_map(params![subject, limit as i64], row_to_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    fn episode_covering(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>> {
        self.query_episode(
            &format!(
                "SELECT {EPISODE_COLUMNS} FROM episodes
                 WHERE subject_id = ?1 AND started_at <= ?2 AND last_date >= ?2
                 ORDER BY started_at ASC, id ASC
                 LIMIT 1"
            ),
            params![subject, format_date(date)],
        )
    }

    fn closest_before(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>> {
        self.query_episode(
            &format!(
                "SELECT {EPISODE_COLUMNS} FROM episodes
                 WHERE subject_id = ?1 AND started_at <= ?2
                 ORDER BY started_at DESC, id ASC
                 LIMIT 1"
            ),
            params![subject, format_date(date)],
        )
    }

    fn closest_after(&self, subject: SubjectId, date: NaiveDate) -> Result<Option<Episode>> {
        self.query_episode(
            &format!(
                "SELECT {EPISODE_COLUMNS} FROM episodes
                 WHERE subject_id = ?1 AND started_at > ?2
                 ORDER BY started_at ASC, id ASC
                 LIMIT 1"
            ),
            params![subject, format_date(date)],
        )
    }

    fn insert_episode(
        &self,
        subject: SubjectId,
        started_at: NaiveDate,
        last_date: NaiveDate,
    ) -> Result<Episode> {
        self.conn.execute(
            "INSERT INTO episodes (subject_id, started_at, last_date) VALUES (?1, ?2, ?3)",
            params![subject, format_date(started_at), format_date(last_date)],
        )?;
        Ok(Episode {
            id: self.conn.last_insert_rowid(),
            subject_id: subject,
            started_at,
            last_date,
        })
    }

    fn episode_by_id_and_subject(
        &self,
        id: EpisodeId,
        subject: SubjectId,
    ) -> Result<Option<Episode>> {
        self.query_episode(
            &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE id = ?1 AND subject_id = ?2"),
            params![id, subject],
        )
    }

    fn update_episode_bounds(
        &self,
        id: EpisodeId,
        started_at: NaiveDate,
        last_date: NaiveDate,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE episodes SET started_at = ?2, last_date = ?3 WHERE id = ?1",
            params![id, format_date(started_at), format_date(last_date)],
        )?;
        Ok(())
    }
}

impl DateEntryStore for Database {
    fn insert_date(&self, episode_id: EpisodeId, date: NaiveDate) -> Result<DateEntry> {
        self.conn.execute(
            "INSERT INTO date_entries (episode_id, date) VALUES (?1, ?2)",
            params![episode_id, format_date(date)],
        )?;
        Ok(DateEntry {
            id: self.conn.last_insert_rowid(),
            episode_id,
            date,
        })
    }

    fn find_by_episode_and_date(
        &self,
        episode_id: EpisodeId,
        date: NaiveDate,
    ) -> Result<Option<DateEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, episode_id, date FROM date_entries WHERE episode_id = ?1 AND date = ?2",
                params![episode_id, format_date(date)],
                row_to_date_entry,
            )
            .optional()?)
    }

    fn delete_date(&self, id: DateEntryId) -> Result<()> {
        self.conn
            .execute("DELETE FROM date_entries WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn date_by_id(&self, id: DateEntryId) -> Result<Option<DateEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, episode_id, date FROM date_entries WHERE id = ?1",
                params![id],
                row_to_date_entry,
            )
            .optional()?)
    }

    fn dates_for_episode(&self, episode_id: EpisodeId) -> Result<Vec<DateEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, episode_id, date FROM date_entries
             WHERE episode_id = ?1
             ORDER BY date ASC",
        )?;
        let dates = stmt
            .query_map(params![episode_id], row_to_date_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dates)
    }
}

impl ProfileReader for Database {
    fn profile(&self, subject: SubjectId) -> Result<Option<Profile>> {
        Ok(self
            .conn
            .query_row(
                "SELECT subject_id, initial_period_date, menstrual_cycle_duration, is_menstrual_cycle_regular
                 FROM profiles WHERE subject_id = ?1",
                params![subject],
                |row| {
                    let seed = match row.get::<_, Option<String>>(1)? {
                        Some(_) => Some(parse_date(row, 1)?),
                        None => None,
                    };
                    Ok(Profile {
                        subject_id: row.get(0)?,
                        initial_period_date: seed,
                        menstrual_cycle_duration: row.get(2)?,
                        is_menstrual_cycle_regular: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }
}

impl ProfileWriter for Database {
    fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.conn.execute(
            "INSERT INTO profiles (subject_id, initial_period_date, menstrual_cycle_duration, is_menstrual_cycle_regular)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(subject_id) DO UPDATE SET
                initial_period_date = excluded.initial_period_date,
                menstrual_cycle_duration = excluded.menstrual_cycle_duration,
                is_menstrual_cycle_regular = excluded.is_menstrual_cycle_regular",
            params![
                profile.subject_id,
                profile.initial_period_date.map(format_date),
                profile.menstrual_cycle_duration,
                profile.is_menstrual_cycle_regular,
            ],
        )?;
        Ok(())
    }
}

impl Store for Database {
    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// SQLite takes the write lock up front, which serializes writers
    /// across processes sharing the same file. The lock is database-wide,
    /// so `subject` only feeds the log.
    fn exclusive<T, F>(&self, subject: SubjectId, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(subject, error = %e, "rolling back exclusive section");
                tx.rollback()?;
                Err(e)
            }
        }
    }
}
