//! Operation store — the success-only stream of encrypt/decrypt calls.

use crate::error::{StorageError, StorageResult};
use crate::{from_millis, to_millis};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use privguard_types::{KeyAlgorithm, OperationKind, OperationOutcome, OperationRecord};
use std::sync::{Arc, Mutex};

/// Store over the append-only `operations` table.
#[derive(Clone)]
pub struct OperationStore {
    conn: Arc<Mutex<Connection>>,
}

/// An operation row before the store assigns its id.
pub struct NewOperation<'a> {
    pub actor: i64,
    pub key_internal_id: Option<i64>,
    pub kind: OperationKind,
    pub algorithm: KeyAlgorithm,
    pub resource_label: Option<&'a str>,
    pub outcome: OperationOutcome,
    pub timestamp: DateTime<Utc>,
}

const OP_COLUMNS: &str =
    "id, actor, key_internal_id, kind, algorithm, resource_label, outcome, timestamp";

impl OperationStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, new: &NewOperation<'_>) -> StorageResult<OperationRecord> {
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO operations \
             (id, actor, key_internal_id, kind, algorithm, resource_label, outcome, timestamp) \
             VALUES (nextval('operations_id_seq'), ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
            params![
                new.actor,
                new.key_internal_id,
                new.kind.to_string(),
                new.algorithm.to_string(),
                new.resource_label,
                new.outcome.to_string(),
                to_millis(new.timestamp),
            ],
            |row| row.get(0),
        )?;

        Ok(OperationRecord {
            id,
            actor: new.actor,
            key_internal_id: new.key_internal_id,
            kind: new.kind,
            algorithm: new.algorithm,
            resource_label: new.resource_label.map(str::to_string),
            outcome: new.outcome,
            timestamp: new.timestamp,
        })
    }

    /// Most recent operations for an actor, newest first.
    pub fn list_for_actor(&self, actor: i64, limit: usize) -> StorageResult<Vec<OperationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OP_COLUMNS} FROM operations WHERE actor = ? ORDER BY id DESC LIMIT ?"
        ))?;
        let rows = stmt.query_map(params![actor, limit as i64], row_to_raw)?;
        collect_ops(rows)
    }

    /// Operations for an actor at or after `since`, oldest first — the
    /// anomaly detector's window query.
    pub fn recent_for_actor(
        &self,
        actor: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<OperationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OP_COLUMNS} FROM operations WHERE actor = ? AND timestamp >= ? ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![actor, to_millis(since)], row_to_raw)?;
        collect_ops(rows)
    }
}

type RawOpRow = (
    i64,
    i64,
    Option<i64>,
    String,
    String,
    Option<String>,
    String,
    i64,
);

fn row_to_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawOpRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn op_from_raw(raw: RawOpRow) -> StorageResult<OperationRecord> {
    let (id, actor, key_internal_id, kind, algorithm, resource_label, outcome, ts) = raw;
    Ok(OperationRecord {
        id,
        actor,
        key_internal_id,
        kind: kind
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        algorithm: algorithm
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        resource_label,
        outcome: outcome
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        timestamp: from_millis(ts)?,
    })
}

fn collect_ops(
    rows: impl Iterator<Item = duckdb::Result<RawOpRow>>,
) -> StorageResult<Vec<OperationRecord>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(op_from_raw(row?)?);
    }
    Ok(out)
}

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS operations_id_seq START 1;
        CREATE TABLE IF NOT EXISTS operations (
            id BIGINT PRIMARY KEY,
            actor BIGINT NOT NULL,
            key_internal_id BIGINT,
            kind VARCHAR NOT NULL,
            algorithm VARCHAR NOT NULL,
            resource_label VARCHAR,
            outcome VARCHAR NOT NULL,
            timestamp BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_operations_actor ON operations(actor, timestamp);
        "#,
    )?;
    Ok(())
}
