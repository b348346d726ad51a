//! Audit store — append-only, totally ordered log of all actions.
//!
//! Ids come from a database sequence, so they are strictly increasing
//! across the process. There is no update or delete path.

use crate::error::{StorageError, StorageResult};
use crate::{from_millis, to_millis};
use chrono::{DateTime, Utc};
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection};
use privguard_types::{AuditAction, AuditEntry, AuditRecord, AuditStatus};
use std::sync::{Arc, Mutex};

/// Store over the append-only `audit_logs` table.
#[derive(Clone)]
pub struct AuditStore {
    conn: Arc<Mutex<Connection>>,
}

/// Equality filters for audit queries. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor: Option<i64>,
    pub action: Option<AuditAction>,
    pub status: Option<AuditStatus>,
}

const AUDIT_COLUMNS: &str =
    "id, actor, action, resource, status, client_address, client_agent, details, timestamp";

impl AuditStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Appends an entry, stamping id and timestamp.
    pub fn append(&self, entry: &AuditEntry, now: DateTime<Utc>) -> StorageResult<AuditRecord> {
        let details_json = serde_json::to_string(&entry.details)?;
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO audit_logs \
             (id, actor, action, resource, status, client_address, client_agent, details, timestamp) \
             VALUES (nextval('audit_logs_id_seq'), ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
            params![
                entry.actor,
                entry.action.to_string(),
                entry.resource,
                entry.status.to_string(),
                entry.client_address,
                entry.client_agent,
                details_json,
                to_millis(now),
            ],
            |row| row.get(0),
        )?;

        Ok(AuditRecord {
            id,
            actor: entry.actor,
            action: entry.action,
            resource: entry.resource.clone(),
            status: entry.status,
            client_address: entry.client_address.clone(),
            client_agent: entry.client_agent.clone(),
            details: entry.details.clone(),
            timestamp: now,
        })
    }

    /// Filtered query, newest first.
    pub fn query(
        &self,
        filter: &AuditFilter,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<AuditRecord>> {
        let (where_sql, mut values) = filter_clause(filter);
        values.push(Value::BigInt(limit as i64));
        values.push(Value::BigInt(offset as i64));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs{where_sql} ORDER BY id DESC LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(params_from_iter(values), row_to_raw)?;
        collect_audits(rows)
    }

    /// Total rows matching the filter.
    pub fn count(&self, filter: &AuditFilter) -> StorageResult<i64> {
        let (where_sql, values) = filter_clause(filter);
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM audit_logs{where_sql}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Audit rows for an actor at or after `since`, oldest first — the
    /// anomaly detector's window query.
    pub fn recent_for_actor(
        &self,
        actor: i64,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<AuditRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE actor = ? AND timestamp >= ? ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![actor, to_millis(since)], row_to_raw)?;
        collect_audits(rows)
    }
}

fn filter_clause(filter: &AuditFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(actor) = filter.actor {
        clauses.push("actor = ?");
        values.push(Value::BigInt(actor));
    }
    if let Some(action) = filter.action {
        clauses.push("action = ?");
        values.push(Value::Text(action.to_string()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.to_string()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

type RawAuditRow = (
    i64,
    Option<i64>,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    i64,
);

fn row_to_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawAuditRow> {
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
    ))
}

fn audit_from_raw(raw: RawAuditRow) -> StorageResult<AuditRecord> {
    let (id, actor, action, resource, status, client_address, client_agent, details, ts) = raw;
    Ok(AuditRecord {
        id,
        actor,
        action: action
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        resource,
        status: status
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        client_address,
        client_agent,
        details: serde_json::from_str(&details)?,
        timestamp: from_millis(ts)?,
    })
}

fn collect_audits(
    rows: impl Iterator<Item = duckdb::Result<RawAuditRow>>,
) -> StorageResult<Vec<AuditRecord>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(audit_from_raw(row?)?);
    }
    Ok(out)
}

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS audit_logs_id_seq START 1;
        CREATE TABLE IF NOT EXISTS audit_logs (
            id BIGINT PRIMARY KEY,
            actor BIGINT,
            action VARCHAR NOT NULL,
            resource VARCHAR,
            status VARCHAR NOT NULL,
            client_address VARCHAR,
            client_agent VARCHAR,
            details VARCHAR NOT NULL DEFAULT '{}',
            timestamp BIGINT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_actor ON audit_logs(actor, timestamp);
        CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_logs(action);
        "#,
    )?;
    Ok(())
}
