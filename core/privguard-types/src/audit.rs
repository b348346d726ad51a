//! Audit records — the append-only, totally ordered stream of all actions,
//! including failures. This is the substrate the anomaly detector reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The enumerated set of auditable actions.
///
/// The read-surface actions (`KeyList`, `OperationList`, `AuditQuery`,
/// `AlertsView`) are recorded only when the policy guard denies the
/// call; successful reads are not audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    UserLogin,
    UserLogout,
    UserRegister,
    UserUpdate,
    DataEncrypt,
    DataDecrypt,
    KeyGenerate,
    KeyRevoke,
    KeyBackup,
    KeyRestore,
    AnomalyDetected,
    AlertsCleared,
    KeyList,
    OperationList,
    AuditQuery,
    AlertsView,
}

impl AuditAction {
    /// The two data-plane actions the failure-rate detector counts.
    pub fn is_data_action(&self) -> bool {
        matches!(self, AuditAction::DataEncrypt | AuditAction::DataDecrypt)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::UserLogin => "USER_LOGIN",
            AuditAction::UserLogout => "USER_LOGOUT",
            AuditAction::UserRegister => "USER_REGISTER",
            AuditAction::UserUpdate => "USER_UPDATE",
            AuditAction::DataEncrypt => "DATA_ENCRYPT",
            AuditAction::DataDecrypt => "DATA_DECRYPT",
            AuditAction::KeyGenerate => "KEY_GENERATE",
            AuditAction::KeyRevoke => "KEY_REVOKE",
            AuditAction::KeyBackup => "KEY_BACKUP",
            AuditAction::KeyRestore => "KEY_RESTORE",
            AuditAction::AnomalyDetected => "ANOMALY_DETECTED",
            AuditAction::AlertsCleared => "ALERTS_CLEARED",
            AuditAction::KeyList => "KEY_LIST",
            AuditAction::OperationList => "OPERATION_LIST",
            AuditAction::AuditQuery => "AUDIT_QUERY",
            AuditAction::AlertsView => "ALERTS_VIEW",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AuditAction {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER_LOGIN" => Ok(AuditAction::UserLogin),
            "USER_LOGOUT" => Ok(AuditAction::UserLogout),
            "USER_REGISTER" => Ok(AuditAction::UserRegister),
            "USER_UPDATE" => Ok(AuditAction::UserUpdate),
            "DATA_ENCRYPT" => Ok(AuditAction::DataEncrypt),
            "DATA_DECRYPT" => Ok(AuditAction::DataDecrypt),
            "KEY_GENERATE" => Ok(AuditAction::KeyGenerate),
            "KEY_REVOKE" => Ok(AuditAction::KeyRevoke),
            "KEY_BACKUP" => Ok(AuditAction::KeyBackup),
            "KEY_RESTORE" => Ok(AuditAction::KeyRestore),
            "ANOMALY_DETECTED" => Ok(AuditAction::AnomalyDetected),
            "ALERTS_CLEARED" => Ok(AuditAction::AlertsCleared),
            "KEY_LIST" => Ok(AuditAction::KeyList),
            "OPERATION_LIST" => Ok(AuditAction::OperationList),
            "AUDIT_QUERY" => Ok(AuditAction::AuditQuery),
            "ALERTS_VIEW" => Ok(AuditAction::AlertsView),
            other => Err(crate::ParseEnumError::new("audit action", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failed,
    Warning,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Success => write!(f, "SUCCESS"),
            AuditStatus::Failed => write!(f, "FAILED"),
            AuditStatus::Warning => write!(f, "WARNING"),
        }
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(AuditStatus::Success),
            "FAILED" => Ok(AuditStatus::Failed),
            "WARNING" => Ok(AuditStatus::Warning),
            other => Err(crate::ParseEnumError::new("audit status", other)),
        }
    }
}

/// A stamped audit row. Ids are strictly increasing; rows are never
/// mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    /// Absent for pre-authentication events.
    pub actor: Option<i64>,
    pub action: AuditAction,
    pub resource: Option<String>,
    pub status: AuditStatus,
    pub client_address: Option<String>,
    pub client_agent: Option<String>,
    pub details: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// Convenience accessor for the sanitized error kind written on
    /// failure paths.
    pub fn error_detail(&self) -> Option<&str> {
        self.details.get("error").and_then(Value::as_str)
    }
}

/// An audit row before the recorder stamps id and timestamp.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: Option<i64>,
    pub action: AuditAction,
    pub resource: Option<String>,
    pub status: AuditStatus,
    pub client_address: Option<String>,
    pub client_agent: Option<String>,
    pub details: Map<String, Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, status: AuditStatus) -> Self {
        Self {
            actor: None,
            action,
            resource: None,
            status,
            client_address: None,
            client_agent: None,
            details: Map::new(),
        }
    }

    pub fn with_actor(mut self, actor: i64) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_client(mut self, address: Option<String>, agent: Option<String>) -> Self {
        self.client_address = address;
        self.client_agent = agent;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
