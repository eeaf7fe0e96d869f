//! SQLite persistence layer for accepted notifications.
//!
//! A single append-only table holds every accepted notification together
//! with its embedding:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS notifications (
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     content    TEXT NOT NULL,
//!     embedding  TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//! ```
//!
//! - `AUTOINCREMENT` keeps ids monotonic even across deletions.
//! - Embeddings are stored as a JSON array of floats.
//! - All access goes through one mutex-guarded connection: writes are
//!   serialised and every read is a single `SELECT` under the same lock, so a
//!   reader never observes half of a record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::embedding::ensure_dimensions;
use crate::error::{PulseError, Result};
use crate::types::{Embedding, NewNotification, NotificationId, NotificationRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS notifications (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    content    TEXT NOT NULL,
    embedding  TEXT NOT NULL,
    created_at TEXT NOT NULL
);";

// ---------------------------------------------------------------------------
// NotificationStore
// ---------------------------------------------------------------------------

/// Handle to the SQLite database that stores [`NotificationRecord`]s.
///
/// Cloning is cheap and shares the same underlying connection.
///
/// # Usage
///
/// ```no_run
/// # use pulse_core::persistence::NotificationStore;
/// # use pulse_core::config::PersistenceConfig;
/// # use pulse_core::types::{Embedding, NewNotification};
/// let store = NotificationStore::open("notifications.db", &PersistenceConfig::default())?;
/// let saved = store.save(NewNotification::new("hello", Embedding(vec![0.1, 0.2]))?)?;
/// assert_eq!(store.list()?.last().map(|r| r.id), Some(saved.id));
/// # Ok::<(), pulse_core::error::PulseError>(())
/// ```
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<Mutex<StoreInner>>,
    db_path: PathBuf,
}

struct StoreInner {
    conn: Connection,
    /// Dimensionality of the stored vectors; `None` while the table is empty.
    dimensions: Option<usize>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl NotificationStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// The schema is automatically created if it does not exist.
    /// WAL mode is enabled when `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;

        let store = Self::from_connection(conn, db_path)?;

        info!(
            path = %store.db_path.display(),
            wal = config.wal_mode,
            "Notification store opened"
        );

        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        let first: Option<String> = conn
            .query_row(
                "SELECT embedding FROM notifications ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let dimensions = first
            .map(|json| decode_embedding(&json).map(|e| e.dimensions()))
            .transpose()?;

        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner { conn, dimensions })),
            db_path,
        })
    }

    // ------------------------------------------------------------------
    // Core operations
    // ------------------------------------------------------------------

    /// Append a notification and return the stored record.
    ///
    /// The store assigns the id. The first saved vector fixes the store's
    /// dimensionality; later vectors must match it.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::DimensionMismatch`] if the embedding's size
    /// differs from the stored vectors, [`PulseError::Serialization`] if JSON
    /// encoding fails, or [`PulseError::Database`] on SQLite failures.
    pub fn save(&self, notification: NewNotification) -> Result<NotificationRecord> {
        let start = Instant::now();
        let mut inner = self.inner.lock();

        if let Some(expected) = inner.dimensions {
            ensure_dimensions(expected, notification.embedding())?;
        }

        let json = serde_json::to_string(notification.embedding())
            .map_err(|e| PulseError::Serialization(e.to_string()))?;
        let created_at = Utc::now();

        inner.conn.execute(
            "INSERT INTO notifications (content, embedding, created_at) VALUES (?1, ?2, ?3)",
            params![notification.content(), json, created_at.to_rfc3339()],
        )?;
        let id = NotificationId(inner.conn.last_insert_rowid());
        inner.dimensions = Some(notification.embedding().dimensions());
        drop(inner);

        debug!(
            id = %id,
            dims = notification.embedding().dimensions(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved notification"
        );

        let (content, embedding) = notification.into_parts();
        Ok(NotificationRecord {
            id,
            content,
            embedding,
            created_at,
        })
    }

    /// All stored notifications in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Serialization`] if a stored row cannot be
    /// decoded, or [`PulseError::Database`] on SQLite failures.
    pub fn list(&self) -> Result<Vec<NotificationRecord>> {
        let start = Instant::now();
        let rows: Vec<RawRow> = {
            let inner = self.inner.lock();
            let mut stmt = inner.conn.prepare_cached(
                "SELECT id, content, embedding, created_at FROM notifications ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], RawRow::from_row)?
                .collect::<rusqlite::Result<Vec<RawRow>>>()?;
            rows
        };

        let records = rows
            .into_iter()
            .map(RawRow::decode)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            count = records.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Listed notifications"
        );

        Ok(records)
    }

    /// Fetch a single notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Serialization`] if the row cannot be decoded, or
    /// [`PulseError::Database`] on SQLite failures.
    pub fn get(&self, id: NotificationId) -> Result<Option<NotificationRecord>> {
        let row = {
            let inner = self.inner.lock();
            let mut stmt = inner.conn.prepare_cached(
                "SELECT id, content, embedding, created_at FROM notifications WHERE id = ?1",
            )?;
            let row = stmt.query_row(params![id.0], RawRow::from_row).optional()?;
            row
        };
        row.map(RawRow::decode).transpose()
    }

    /// Return the total number of stored notifications.
    ///
    /// # Errors
    ///
    /// Returns [`PulseError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .inner
            .lock()
            .conn
            .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| PulseError::Serialization(e.to_string()))
    }

    /// Dimensionality of the stored vectors, or `None` if the store is empty.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.inner.lock().dimensions
    }

    /// Return the path to the database file (or `:memory:` for in-memory DBs).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

/// Row as read from SQLite, decoded outside the lock.
struct RawRow {
    id: i64,
    content: String,
    embedding: String,
    created_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            embedding: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn decode(self) -> Result<NotificationRecord> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| PulseError::Serialization(format!("row {}: {e}", self.id)))?
            .with_timezone(&Utc);
        Ok(NotificationRecord {
            id: NotificationId(self.id),
            content: self.content,
            embedding: decode_embedding(&self.embedding)?,
            created_at,
        })
    }
}

fn decode_embedding(json: &str) -> Result<Embedding> {
    serde_json::from_str(json).map_err(|e| PulseError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
