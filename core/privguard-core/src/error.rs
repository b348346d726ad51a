//! Core error taxonomy.
//!
//! Cryptographic and input errors surface to the caller verbatim;
//! authorization failures collapse to the opaque `NotAuthorized` so the
//! error channel is not an oracle; internal failures carry detail in the
//! audit stream only.

use privguard_crypto::CryptoError;
use privguard_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    // Input
    #[error("unsupported algorithm: {0}")]
    BadAlgorithm(String),

    #[error("input too large: {got} bytes exceeds the limit of {limit}")]
    InputTooLarge { got: usize, limit: usize },

    #[error("malformed ciphertext envelope")]
    MalformedEnvelope,

    #[error("malformed backup artifact: {0}")]
    MalformedBackup(String),

    // Authorization
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("not authorized")]
    NotAuthorized,

    // State
    #[error("unknown key")]
    KeyUnknown,

    #[error("key is not active")]
    KeyNotActive,

    #[error("no keys to back up")]
    NothingToBackUp,

    // Cryptographic
    #[error("padding check failed")]
    BadPadding,

    #[error("signature verification failed")]
    BadSignature,

    #[error("random generator failure")]
    RngFailure,

    // Internal
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("missing configuration: {0}")]
    ConfigMissing(String),
}

impl CoreError {
    /// Stable short code written to `details.error` on failure audits.
    /// The anomaly detector matches on these, so they must not drift.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::BadAlgorithm(_) => "BadAlgorithm",
            CoreError::InputTooLarge { .. } => "InputTooLarge",
            CoreError::MalformedEnvelope => "MalformedEnvelope",
            CoreError::MalformedBackup(_) => "MalformedBackup",
            CoreError::NotAuthenticated => "NotAuthenticated",
            CoreError::NotAuthorized => "NotAuthorized",
            CoreError::KeyUnknown => "KeyUnknown",
            CoreError::KeyNotActive => "KeyNotActive",
            CoreError::NothingToBackUp => "NothingToBackUp",
            CoreError::BadPadding => "BadPadding",
            CoreError::BadSignature => "BadSignature",
            CoreError::RngFailure => "RngFailure",
            CoreError::PersistenceFailure(_) => "PersistenceFailure",
            CoreError::ConfigMissing(_) => "ConfigMissing",
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        CoreError::PersistenceFailure(e.to_string())
    }
}

impl From<CryptoError> for CoreError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadPadding => CoreError::BadPadding,
            CryptoError::BadSignature => CoreError::BadSignature,
            CryptoError::RngFailure(_) => CoreError::RngFailure,
            // AEAD open failures are the authenticated analogue of a
            // padding failure on decrypt.
            CryptoError::Decryption(_) => CoreError::BadPadding,
            // Remaining primitive failures only arise from stored
            // material, never from caller input; messages carry no
            // secrets.
            CryptoError::BadKey(m) | CryptoError::Encryption(m) => {
                CoreError::PersistenceFailure(m)
            }
        }
    }
}
