//! Durable, append-only sample storage
//!
//! A single SQLite table keyed by an auto-incrementing sequence id. The
//! daemon is the only writer; report and training paths open their own
//! read connections. WAL journaling keeps readers unblocked while the
//! writer commits, and each append is one committed statement, so a torn
//! sample is never visible.

use crate::error::StorageError;
use crate::models::{Sample, StoredSample};
use chrono::DateTime;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS system_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    cpu_percent REAL NOT NULL,
    memory_percent REAL NOT NULL,
    process_count INTEGER NOT NULL,
    active_network_connections INTEGER NOT NULL
);
";

/// Append-only log of [`Sample`]s backed by SQLite.
///
/// The connection sits behind a mutex so the store is `Sync` and a daemon
/// owning it can be spawned onto the runtime; the single-writer discipline
/// means the lock is never contended in practice.
pub struct MetricStore {
    conn: Mutex<Connection>,
}

impl MetricStore {
    /// Open (or create) the store file, creating parent directories as
    /// needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // WAL so report/train readers never block the daemon's appends.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Create the underlying table if absent. Idempotent.
    pub fn init(&self) -> Result<(), StorageError> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Persist one sample and return it with its assigned sequence id.
    ///
    /// Timestamps are stored at second precision; the returned
    /// [`StoredSample`] carries the truncated timestamp exactly as a later
    /// read will see it. Arrival order is accepted as-is, even if
    /// timestamps run backwards.
    pub fn append(&self, sample: &Sample) -> Result<StoredSample, StorageError> {
        let ts = sample.timestamp.timestamp();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO system_metrics
                 (timestamp, cpu_percent, memory_percent, process_count, active_network_connections)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ts,
                sample.cpu_percent,
                sample.memory_percent,
                sample.process_count,
                sample.active_network_connections,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, "Appended sample");

        Ok(StoredSample {
            id,
            sample: Sample {
                timestamp: DateTime::from_timestamp(ts, 0).unwrap_or(sample.timestamp),
                ..sample.clone()
            },
        })
    }

    /// Full history, ordered by sequence id ascending. An empty store
    /// yields an empty vector.
    pub fn all(&self) -> Result<Vec<StoredSample>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, cpu_percent, memory_percent, process_count,
                    active_network_connections
             FROM system_metrics ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let ts: i64 = row.get(1)?;
            Ok(StoredSample {
                id: row.get(0)?,
                sample: Sample {
                    timestamp: DateTime::from_timestamp(ts, 0).unwrap_or_default(),
                    cpu_percent: row.get(2)?,
                    memory_percent: row.get(3)?,
                    process_count: row.get::<_, i64>(4)? as u64,
                    active_network_connections: row.get::<_, i64>(5)? as u64,
                },
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
