//! Database module for the average bot
//!
//! Per-user profile (degree flag and two grade lists), stored feedback, and
//! conversations parked while their session task is not running.
//! Every setter is a single-column upsert, so concurrent writers for the same
//! user never clobber each other's columns.

mod schema;

pub use schema::*;

use crate::grades::{pack_grades, unpack_grades, CodecError, GradeEntry};
use crate::state_machine::{GradeSlot, Session, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt grade list for user {user_id}: {source}")]
    Codec {
        user_id: UserId,
        #[source]
        source: CodecError,
    },
    #[error("Corrupt parked session: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Opened database");
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Profile Operations ====================

    /// Degree flag, `None` when the user never answered
    pub fn get_degree_flag(&self, user_id: UserId) -> DbResult<Option<bool>> {
        let conn = self.conn.lock().unwrap();
        let flag: Option<Option<i64>> = conn
            .query_row(
                "SELECT exact_science FROM users WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag.flatten().map(|v| v != 0))
    }

    pub fn set_degree_flag(&self, user_id: UserId, is_exact_sciences: bool) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (user_id, exact_science) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET exact_science = excluded.exact_science",
            params![user_id, i64::from(is_exact_sciences)],
        )?;
        Ok(())
    }

    /// Stored grade list; empty when the user or the list does not exist
    pub fn get_grades(&self, user_id: UserId, slot: GradeSlot) -> DbResult<Vec<GradeEntry>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM users WHERE user_id = ?1",
            grade_column(slot)
        );
        let packed: Option<Option<String>> = conn
            .query_row(&sql, params![user_id], |row| row.get(0))
            .optional()?;

        match packed.flatten() {
            Some(text) => {
                unpack_grades(&text).map_err(|source| DbError::Codec { user_id, source })
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn set_grades(&self, user_id: UserId, slot: GradeSlot, grades: &[GradeEntry]) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let column = grade_column(slot);
        let sql = format!(
            "INSERT INTO users (user_id, {column}) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET {column} = excluded.{column}"
        );
        conn.execute(&sql, params![user_id, pack_grades(grades)])?;
        Ok(())
    }

    /// Every user with a profile row
    pub fn all_user_ids(&self) -> DbResult<Vec<UserId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT user_id FROM users ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<UserId>, _>>()?;
        Ok(ids)
    }

    pub fn user_exists(&self, user_id: UserId) -> DbResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists = conn
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }

    pub fn count_users(&self) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== Feedback Operations ====================

    pub fn add_feedback(&self, user_id: UserId, text: &str) -> DbResult<Feedback> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO feedback (user_id, text, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, text, now.to_rfc3339()],
        )?;

        Ok(Feedback {
            id: conn.last_insert_rowid(),
            user_id,
            text: text.to_string(),
            created_at: now,
        })
    }

    /// Most recent feedback first
    #[allow(dead_code)] // Used in tests
    pub fn recent_feedback(&self, limit: u32) -> DbResult<Vec<Feedback>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, text, created_at FROM feedback
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(Feedback {
                id: row.get(0)?,
                user_id: row.get(1)?,
                text: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Parked Session Operations ====================

    /// Store an unfinished conversation, replacing any earlier one
    pub fn park_session(&self, session: &Session) -> DbResult<()> {
        let session_json = serde_json::to_string(session)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sessions (user_id, session, parked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                session = excluded.session,
                parked_at = excluded.parked_at",
            params![session.user_id, session_json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Remove and return the parked conversation, if any
    pub fn take_parked_session(&self, user_id: UserId) -> DbResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let session_json: Option<String> = conn
            .query_row(
                "SELECT session FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(session_json) = session_json else {
            return Ok(None);
        };
        // Removed before decoding, so an unreadable row is discarded too
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(Some(serde_json::from_str(&session_json)?))
    }
}

fn grade_column(slot: GradeSlot) -> &'static str {
    match slot {
        GradeSlot::Last => "last_grades",
        GradeSlot::Saved => "saved_grades",
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
