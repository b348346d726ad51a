//! Operation records — the success-only stream of encrypt/decrypt calls.

use crate::KeyAlgorithm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Encrypt,
    Decrypt,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Encrypt => write!(f, "encrypt"),
            OperationKind::Decrypt => write!(f, "decrypt"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encrypt" => Ok(OperationKind::Encrypt),
            "decrypt" => Ok(OperationKind::Decrypt),
            other => Err(crate::ParseEnumError::new("operation kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationOutcome {
    Success,
    Failure,
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Success => write!(f, "success"),
            OperationOutcome::Failure => write!(f, "failure"),
        }
    }
}

impl std::str::FromStr for OperationOutcome {
    type Err = crate::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(OperationOutcome::Success),
            "failure" => Ok(OperationOutcome::Failure),
            other => Err(crate::ParseEnumError::new("operation outcome", other)),
        }
    }
}

/// One encrypt/decrypt call. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: i64,
    pub actor: i64,
    /// Absent for administrative actions.
    pub key_internal_id: Option<i64>,
    pub kind: OperationKind,
    pub algorithm: KeyAlgorithm,
    /// Free-form caller-supplied label; never interpreted by the core.
    pub resource_label: Option<String>,
    pub outcome: OperationOutcome,
    pub timestamp: DateTime<Utc>,
}
