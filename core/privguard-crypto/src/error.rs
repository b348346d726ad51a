//! Primitive-layer error types.

use thiserror::Error;

/// Result type for primitive operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from the primitive layer. Messages never include key bytes,
/// plaintext, or PEM bodies.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    BadKey(String),

    #[error("padding check failed")]
    BadPadding,

    #[error("signature verification failed")]
    BadSignature,

    #[error("random generator failure: {0}")]
    RngFailure(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}
