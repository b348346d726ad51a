//! DuckDB storage layer for PrivGuard.
//!
//! Persists the four tables of the core — `encryption_keys`,
//! `operations`, `audit_logs`, and `users` — in a single database.
//! Each store is a cheap handle over the shared connection; all access
//! is serialized by the connection mutex, which is also what makes
//! `last_used_at` updates and audit id assignment atomic.

mod audit_store;
mod error;
mod key_store;
mod operation_store;
mod user_store;

pub use audit_store::{AuditFilter, AuditStore};
pub use error::{StorageError, StorageResult};
pub use key_store::{KeyStore, NewKey};
pub use operation_store::{NewOperation, OperationStore};
pub use user_store::{NewUser, UserStore};

use chrono::{DateTime, TimeZone, Utc};
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle to the PrivGuard database. Clone freely; all clones share the
/// underlying connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens or creates the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_database(path)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn keys(&self) -> KeyStore {
        KeyStore::new(self.conn.clone())
    }

    pub fn operations(&self) -> OperationStore {
        OperationStore::new(self.conn.clone())
    }

    pub fn audit(&self) -> AuditStore {
        AuditStore::new(self.conn.clone())
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.conn.clone())
    }
}

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the
/// database, it is removed and the open retried once — an unclean
/// shutdown can leave a WAL that prevents reopening. The key and audit
/// tables are tiny, so resource limits are pinned low.
fn open_database(path: &Path) -> StorageResult<Connection> {
    let conn = match Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() && std::fs::remove_file(&wal_path).is_ok() {
                let c = Connection::open(path)?;
                apply_resource_limits(&c)?;
                return Ok(c);
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn)?;
    Ok(conn)
}

fn apply_resource_limits(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch("PRAGMA memory_limit='64MB'; PRAGMA threads=1;")?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    key_store::initialize(conn)?;
    operation_store::initialize(conn)?;
    audit_store::initialize(conn)?;
    user_store::initialize(conn)?;
    Ok(())
}

/// Timestamps are stored as BIGINT unix milliseconds.
pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::InvalidRow(format!("timestamp out of range: {ms}")))
}

pub(crate) fn from_millis_opt(ms: Option<i64>) -> StorageResult<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}
