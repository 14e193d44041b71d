//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished focus sessions (the analytics log)
//! - XP awards
//! - Key-value store for application state (timer state, streak,
//!   scheduled notification)

use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{data_dir, KvStore};
use crate::effects::{SessionRecord, SessionStatus};
use crate::error::DatabaseError;
use crate::timer::{FocusQuality, SessionType};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed: u64,
    pub abandoned: u64,
    pub skipped: u64,
    pub focus_secs: u64,
    pub break_secs: u64,
    pub xp_earned: u64,
    pub perfect: u64,
    pub good: u64,
    pub distracted: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/robofocus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("robofocus.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id                  TEXT PRIMARY KEY,
                session_type        TEXT NOT NULL,
                planned_secs        INTEGER NOT NULL,
                actual_secs         INTEGER NOT NULL,
                status              TEXT NOT NULL,
                xp_earned           INTEGER NOT NULL DEFAULT 0,
                category            TEXT,
                task_label          TEXT,
                shield_attempts     INTEGER,
                focus_quality       TEXT,
                blocking_configured INTEGER NOT NULL DEFAULT 0,
                started_at          TEXT NOT NULL,
                ended_at            TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS xp_ledger (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                minutes    INTEGER NOT NULL,
                xp         INTEGER NOT NULL,
                awarded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_session_type ON sessions(session_type);",
        )?;
        Ok(())
    }

    /// Record a finished session. Re-recording the same id replaces it.
    pub fn insert_session(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sessions (
                id, session_type, planned_secs, actual_secs, status, xp_earned,
                category, task_label, shield_attempts, focus_quality,
                blocking_configured, started_at, ended_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.session_id.to_string(),
                record.session_type.as_str(),
                record.planned_secs,
                record.actual_secs,
                record.status.as_str(),
                record.xp_earned,
                record.category.map(|c| c.as_str()),
                record.task_label,
                record.shield_attempts,
                record.focus_quality.map(|q| q.as_str()),
                record.blocking_configured,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_type, planned_secs, actual_secs, status, xp_earned,
                    category, task_label, shield_attempts, focus_quality,
                    blocking_configured, started_at, ended_at
             FROM sessions
             ORDER BY ended_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], RawSession::from_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.decode()?);
        }
        Ok(sessions)
    }

    /// Aggregate over sessions that ended today, in local time. Uses the
    /// same calendar day as the streak.
    pub fn stats_today(&self) -> Result<Stats, DatabaseError> {
        self.stats_since_day(Local::now().date_naive())
    }

    /// Aggregate over sessions that ended on or after local midnight of `day`.
    pub fn stats_since_day(&self, day: NaiveDate) -> Result<Stats, DatabaseError> {
        self.stats_since(&local_midnight(day).to_rfc3339())
    }

    /// Aggregate over every recorded session.
    pub fn stats_all(&self) -> Result<Stats, DatabaseError> {
        self.stats_since("")
    }

    fn stats_since(&self, since: &str) -> Result<Stats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_type, status, focus_quality,
                    COUNT(*), COALESCE(SUM(actual_secs), 0), COALESCE(SUM(xp_earned), 0)
             FROM sessions
             WHERE ended_at >= ?1
             GROUP BY session_type, status, focus_quality",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, u64>(5)?,
            ))
        })?;

        let mut stats = Stats::default();
        for row in rows {
            let (session_type, status, quality, count, secs, xp) = row?;
            stats.total_sessions += count;
            stats.xp_earned += xp;
            if session_type == SessionType::Break.as_str() {
                stats.break_secs += secs;
            } else {
                stats.focus_secs += secs;
            }
            match status.as_str() {
                "completed" => stats.completed += count,
                "abandoned" => stats.abandoned += count,
                "skipped" => stats.skipped += count,
                _ => {}
            }
            match quality.as_deref() {
                Some("perfect") => stats.perfect += count,
                Some("good") => stats.good += count,
                Some("distracted") => stats.distracted += count,
                _ => {}
            }
        }
        Ok(stats)
    }

    pub fn record_xp(&self, minutes: u64, xp: u64, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO xp_ledger (minutes, xp, awarded_at) VALUES (?1, ?2, ?3)",
            params![minutes, xp, at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn total_xp(&self) -> Result<u64, DatabaseError> {
        let total = self
            .conn
            .query_row("SELECT COALESCE(SUM(xp), 0) FROM xp_ledger", [], |row| {
                row.get::<_, u64>(0)
            })?;
        Ok(total)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl KvStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Database::kv_get(self, key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        Database::kv_set(self, key, value)
    }

    fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        Database::kv_delete(self, key)
    }
}

/// Column values as stored, before enum decoding.
struct RawSession {
    id: String,
    session_type: String,
    planned_secs: u64,
    actual_secs: u64,
    status: String,
    xp_earned: u64,
    category: Option<String>,
    task_label: Option<String>,
    shield_attempts: Option<u32>,
    focus_quality: Option<String>,
    blocking_configured: bool,
    started_at: String,
    ended_at: String,
}

impl RawSession {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            session_type: row.get(1)?,
            planned_secs: row.get(2)?,
            actual_secs: row.get(3)?,
            status: row.get(4)?,
            xp_earned: row.get(5)?,
            category: row.get(6)?,
            task_label: row.get(7)?,
            shield_attempts: row.get(8)?,
            focus_quality: row.get(9)?,
            blocking_configured: row.get(10)?,
            started_at: row.get(11)?,
            ended_at: row.get(12)?,
        })
    }

    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        let corrupt = |message: String| DatabaseError::Corrupt {
            key: format!("sessions/{}", self.id),
            message,
        };
        let session_id = Uuid::parse_str(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let session_type = self
            .session_type
            .parse()
            .map_err(|e: crate::error::ValidationError| corrupt(e.to_string()))?;
        let status = match self.status.as_str() {
            "completed" => SessionStatus::Completed,
            "abandoned" => SessionStatus::Abandoned,
            "skipped" => SessionStatus::Skipped,
            other => return Err(corrupt(format!("unknown status '{other}'"))),
        };
        let category = self
            .category
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: crate::error::ValidationError| corrupt(e.to_string()))?;
        let focus_quality = match self.focus_quality.as_deref() {
            None => None,
            Some("perfect") => Some(FocusQuality::Perfect),
            Some("good") => Some(FocusQuality::Good),
            Some("distracted") => Some(FocusQuality::Distracted),
            Some(other) => return Err(corrupt(format!("unknown focus quality '{other}'"))),
        };
        let parse_time = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(e.to_string()))
        };

        Ok(SessionRecord {
            session_id,
            session_type,
            planned_secs: self.planned_secs,
            actual_secs: self.actual_secs,
            status,
            xp_earned: self.xp_earned,
            category,
            task_label: self.task_label.clone(),
            shield_attempts: self.shield_attempts,
            focus_quality,
            blocking_configured: self.blocking_configured,
            started_at: parse_time(&self.started_at)?,
            ended_at: parse_time(&self.ended_at)?,
        })
    }
}

/// Start of `day` on the local clock, as UTC. Falls back to UTC midnight
/// when a DST gap swallows local midnight.
fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    midnight
        .and_local_timezone(Local)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| midnight.and_utc())
}
