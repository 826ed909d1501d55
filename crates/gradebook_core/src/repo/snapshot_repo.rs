//! Snapshot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and save the `{grades, subjects}` snapshot under a storage key.
//! - Keep SQL and JSON encoding inside the persistence boundary.
//!
//! # Invariants
//! - One row per storage key; saves replace the whole payload.
//! - Payloads that fail to decode surface as `InvalidData`.

use crate::db::DbError;
use crate::model::grade::GradebookSnapshot;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for snapshot persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData(String),
    /// Connection was opened without applying migrations.
    SchemaNotReady,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "snapshot encoding failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted snapshot: {message}"),
            Self::SchemaNotReady => write!(f, "app_state table missing; run migrations first"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) | Self::SchemaNotReady => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Durable keyed storage for gradebook snapshots.
pub trait SnapshotRepository {
    /// Returns `None` when nothing was stored under `key` yet.
    fn load_snapshot(&self, key: &str) -> RepoResult<Option<GradebookSnapshot>>;
    fn save_snapshot(&self, key: &str, snapshot: &GradebookSnapshot) -> RepoResult<()>;
}

/// SQLite-backed snapshot repository over the `app_state` table.
pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - Returns `SchemaNotReady` when `app_state` does not exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'app_state'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(RepoError::SchemaNotReady);
        }
        Ok(Self { conn })
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn load_snapshot(&self, key: &str) -> RepoResult<Option<GradebookSnapshot>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM app_state WHERE storage_key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|err| {
                RepoError::InvalidData(format!("app_state.payload for `{key}`: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn save_snapshot(&self, key: &str, snapshot: &GradebookSnapshot) -> RepoResult<()> {
        let payload = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO app_state (storage_key, payload, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(storage_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at;",
            params![key, payload],
        )?;
        Ok(())
    }
}

impl<R: SnapshotRepository + ?Sized> SnapshotRepository for &R {
    fn load_snapshot(&self, key: &str) -> RepoResult<Option<GradebookSnapshot>> {
        (**self).load_snapshot(key)
    }

    fn save_snapshot(&self, key: &str, snapshot: &GradebookSnapshot) -> RepoResult<()> {
        (**self).save_snapshot(key, snapshot)
    }
}
