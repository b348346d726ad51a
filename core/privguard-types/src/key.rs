//! Key records, the algorithm sum type, and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing one of the closed string enums fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    what: &'static str,
    got: String,
}

impl ParseEnumError {
    pub fn new(what: &'static str, got: &str) -> Self {
        Self {
            what,
            got: got.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.what, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

/// The closed set of supported key algorithms.
///
/// The CBC variants carry no authentication tag and are kept for
/// compatibility with existing ciphertexts; `Aes256Gcm` is the AEAD
/// variant new keys should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "AES-128-CBC")]
    Aes128Cbc,
    #[serde(rename = "AES-256-CBC")]
    Aes256Cbc,
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
    #[serde(rename = "RSA-2048")]
    Rsa2048,
    #[serde(rename = "ECC-P256")]
    EccP256,
}

impl KeyAlgorithm {
    /// All supported algorithms, in display order.
    pub const ALL: [KeyAlgorithm; 5] = [
        KeyAlgorithm::Aes128Cbc,
        KeyAlgorithm::Aes256Cbc,
        KeyAlgorithm::Aes256Gcm,
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::EccP256,
    ];

    /// Symmetric key length in bytes, for the AES variants.
    pub fn aes_key_len(&self) -> Option<usize> {
        match self {
            KeyAlgorithm::Aes128Cbc => Some(16),
            KeyAlgorithm::Aes256Cbc | KeyAlgorithm::Aes256Gcm => Some(32),
            KeyAlgorithm::Rsa2048 | KeyAlgorithm::EccP256 => None,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Aes128Cbc => write!(f, "AES-128-CBC"),
            KeyAlgorithm::Aes256Cbc => write!(f, "AES-256-CBC"),
            KeyAlgorithm::Aes256Gcm => write!(f, "AES-256-GCM"),
            KeyAlgorithm::Rsa2048 => write!(f, "RSA-2048"),
            KeyAlgorithm::EccP256 => write!(f, "ECC-P256"),
        }
    }
}

impl std::str::FromStr for KeyAlgorithm {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES-128-CBC" => Ok(KeyAlgorithm::Aes128Cbc),
            "AES-256-CBC" => Ok(KeyAlgorithm::Aes256Cbc),
            "AES-256-GCM" => Ok(KeyAlgorithm::Aes256Gcm),
            "RSA-2048" => Ok(KeyAlgorithm::Rsa2048),
            "ECC-P256" => Ok(KeyAlgorithm::EccP256),
            other => Err(ParseEnumError::new("algorithm", other)),
        }
    }
}

/// Lifecycle status of a key. Transitions are monotonic toward
/// `Revoked`/`Expired`; no key ever returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Revoked,
    Expired,
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Active => write!(f, "active"),
            KeyStatus::Revoked => write!(f, "revoked"),
            KeyStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for KeyStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(KeyStatus::Active),
            "revoked" => Ok(KeyStatus::Revoked),
            "expired" => Ok(KeyStatus::Expired),
            other => Err(ParseEnumError::new("key status", other)),
        }
    }
}

/// A stored encryption key. `wrapped_material` is ciphertext of the
/// serialized [`crate::KeyMaterial`] under the master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub internal_id: i64,
    /// Opaque stable identifier `K-<millis>-<8 hex>`; external systems
    /// reference keys by this across backup/restore.
    pub public_id: String,
    pub name: String,
    pub owner: i64,
    pub algorithm: KeyAlgorithm,
    pub wrapped_material: Vec<u8>,
    pub wrap_iv: [u8; 16],
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl KeyRecord {
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// Redacted projection safe to hand to callers — no wrapped material,
    /// no wrap IV.
    pub fn redacted(&self) -> KeyInfo {
        KeyInfo {
            internal_id: self.internal_id,
            public_id: self.public_id.clone(),
            name: self.name.clone(),
            owner: self.owner,
            algorithm: self.algorithm,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// What the transport layer sees when listing or creating keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    pub internal_id: i64,
    pub public_id: String,
    pub name: String,
    pub owner: i64,
    pub algorithm: KeyAlgorithm,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}
