//! User store — read side of the `users` table.
//!
//! The core resolves actors here; registration, password handling, and
//! profile mutation live in the transport layer. The insert and status
//! update exist for that layer (and for test fixtures).

use crate::error::{StorageError, StorageResult};
use crate::to_millis;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use privguard_types::{Actor, ActorStatus, Role};
use std::sync::{Arc, Mutex};

/// Store over the `users` table.
#[derive(Clone)]
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
}

/// A user row before the store assigns its id.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn insert(&self, new: &NewUser<'_>) -> StorageResult<Actor> {
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO users \
             (id, username, email, password_hash, full_name, role, status, created_at, last_login) \
             VALUES (nextval('users_id_seq'), ?, ?, NULL, ?, ?, 'active', ?, NULL) \
             RETURNING id",
            params![
                new.username,
                new.email,
                new.full_name,
                new.role.to_string(),
                to_millis(new.created_at),
            ],
            |row| row.get(0),
        )?;

        Ok(Actor {
            id,
            username: new.username.to_string(),
            role: new.role,
            status: ActorStatus::Active,
        })
    }

    pub fn get(&self, id: i64) -> StorageResult<Option<Actor>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, username, role, status FROM users WHERE id = ?",
            params![id],
            row_to_raw,
        );
        match result {
            Ok(raw) => Ok(Some(actor_from_raw(raw)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(&self) -> StorageResult<Vec<Actor>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, username, role, status FROM users ORDER BY id")?;
        let rows = stmt.query_map([], row_to_raw)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(actor_from_raw(row?)?);
        }
        Ok(out)
    }

    pub fn set_status(&self, id: i64, status: ActorStatus) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE users SET status = ? WHERE id = ?",
            params![status.to_string(), id],
        )?;
        Ok(())
    }
}

type RawUserRow = (i64, String, String, String);

fn row_to_raw(row: &duckdb::Row<'_>) -> duckdb::Result<RawUserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn actor_from_raw(raw: RawUserRow) -> StorageResult<Actor> {
    let (id, username, role, status) = raw;
    Ok(Actor {
        id,
        username,
        role: role
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
        status: status
            .parse()
            .map_err(|e: privguard_types::ParseEnumError| StorageError::InvalidRow(e.to_string()))?,
    })
}

pub(crate) fn initialize(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE SEQUENCE IF NOT EXISTS users_id_seq START 1;
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT PRIMARY KEY,
            username VARCHAR NOT NULL UNIQUE,
            email VARCHAR UNIQUE,
            password_hash VARCHAR,
            full_name VARCHAR,
            role VARCHAR NOT NULL,
            status VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            last_login BIGINT
        );
        "#,
    )?;
    Ok(())
}
