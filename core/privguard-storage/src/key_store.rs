//! Key store — persists key records and their lifecycle status.

use crate::error::{StorageError, StorageResult};
use crate::{from_millis, from_millis_opt, to_millis};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use privguard_types::{KeyAlgorithm, KeyRecord, KeyStatus};
use std::sync::{Arc, Mutex};

/// Store over the `encryption_keys` table.
#[derive(Clone)]
pub struct KeyStore {
    conn: Arc<Mutex<Connection>>,
}

/// A key row before the store assigns its internal id.
pub struct NewKey<'a> {
    pub name: &'a str,
    pub owner: i64,
    pub public_id: &'a str,
    pub algorithm: KeyAlgorithm,
    pub wrapped_material: &'a [u8],
    pub wrap_iv: &'a [u8; 16],
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

const KEY_COLUMNS: &str = "id, name, owner, public_id, algorithm, wrapped_material, wrap_iv, \
     status, created_at, updated_at, expires_at, last_used_at";

impl KeyStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Inserts a key and returns the stored record with its assigned id.
    pub fn insert(&self, new: &NewKey<'_>) -> StorageResult<KeyRecord> {
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO encryption_keys \
             (id, name, owner, public_id, algorithm, wrapped_material, wrap_iv, \
              status, created_at, updated_at, expires_at, last_used_at) \
             VALUES (nextval('encryption_keys_id_seq'), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL) \
             RETURNING id",
            params![
                new.name,
                new.owner,
                new.public_id,
                new.algorithm.to_string(),
                new.wrapped_material,
                &new.wrap_iv[..],
                new.status.to_string(),
                to_millis(new.created_at),
                to_millis(new.created_at),
                new.expires_at.map(to_millis),
            ],
            |row| row.get(0),
        )?;

        Ok(KeyRecord {
            internal_id: id,
            public_id: new.public_id.to_string(),
            name: new.name.to_string(),
            owner: new.owner,
            algorithm: new.algorithm,
            wrapped_material: new.wrapped_material.to_vec(),
            wrap_iv: *new.wrap_iv,
            status: new.status,
            created_at: new.created_at,
            updated_at: new.created_at,
            expires_at: new.expires_at,
            last_used_at: None,
        })
    }

    pub fn get(&self, id: i64) -> StorageResult<Option<KeyRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            &format!("SELECT {KEY_COLUMNS} FROM encryption_keys WHERE id = ?"),
            params![id],
            row_to_raw,
        );
        match result {
            Ok(raw) => Ok(Some(key_from_raw(raw)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_public_id(&self, public_id: &str) -> StorageResult<Option<KeyRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            &format!("SELECT {KEY_COLUMNS} FROM encryption_keys WHERE public_id = ?"),
            params![public_id],
            row_to_raw,
        );
        match result {
            Ok(raw) => Ok(Some(key_from_raw(raw)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_owner(&self, owner: i64) -> StorageResult<Vec<KeyRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {KEY_COLUMNS} FROM encryption_keys WHERE owner = ? ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![owner], row_to_raw)?;
        collect_keys(rows)
    }

    pub fn list_all(&self) -> StorageResult<Vec<KeyRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {KEY_COLUMNS} FROM encryption_keys ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_raw)?;
        collect_keys(rows)
    }

    /// Sets the lifecycle status. Monotonicity is the registry's concern;
    /// the store records what it is told.
    pub fn set_status(&self, id: i64, status: KeyStatus, now: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE encryption_keys SET status = ?, updated_at = ? WHERE id = ?",
            params![status.to_string(), to_millis(now), id],
        )?;
        Ok(())
    }

    /// Advances `last_used_at`, never moving it backwards: concurrent
    /// callers race on wall-clock reads, and the stored value must stay
    /// monotonic.
    pub fn touch_last_used(&self, id: i64, now: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let ms = to_millis(now);
        conn.execute(
            "UPDATE encryption_keys \
             SET last_used_at = CASE \
               WHEN last_used_at IS NULL OR last_used_at < ? THEN ? \
               ELSE last_used_at END \
             WHERE id = ?",
            params![ms, ms, id],
        )?;
        Ok(())
    }
}

type RawKeyRow = (
    i64,
    String,
    i64,
    String,
    String,
    Vec<u8>,
    Vec<u8>,
    String,
    i64,
    i64,
    Option<i64>,
    Option<i64>,
);

fn row_to_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawKeyRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

fn key_from_raw(raw: RawKeyRow) -> StorageResult<KeyRecord> {
    let (id, name, owner, public_id, algorithm, wrapped_material, wrap_iv, status, created, updated, expires, last_used) =
        raw;
    let wrap_iv: [u8; 16] = wrap_iv
        .try_into()
        .map_err(|iv: Vec<u8>| StorageError::InvalidRow(format!("wrap_iv has {} bytes", iv.len())))?;
    Ok(KeyRecord {
        internal_id: id,
        public_id,
        name,
        owner,
        algorithm: algorithm
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        wrapped_material,
        wrap_iv,
        status: status
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        created_at: from_millis(created)?,
        updated_at: from_millis(updated)?,
        expires_at: from_millis_opt(expires)?,
        last_used_at: from_millis_opt(last_used)?,
    })
}

fn collect_keys(
    rows: impl Iterator<Item = duckdb::Result<RawKeyRow>>,
) -> StorageResult<Vec<KeyRecord>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(key_from_raw(row?)?);
    }
    Ok(out)
}

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS encryption_keys_id_seq START 1;
        CREATE TABLE IF NOT EXISTS encryption_keys (
            id BIGINT PRIMARY KEY,
            name VARCHAR NOT NULL,
            owner BIGINT NOT NULL,
            public_id VARCHAR NOT NULL UNIQUE,
            algorithm VARCHAR NOT NULL,
            wrapped_material BLOB NOT NULL,
            wrap_iv BLOB NOT NULL,
            status VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            expires_at BIGINT,
            last_used_at BIGINT
        );
        CREATE INDEX IF NOT EXISTS idx_keys_owner ON encryption_keys(owner);
        "#,
    )?;
    Ok(())
}
