//! The master key and envelope wrapping.
//!
//! Key material is never persisted in the clear: the registry wraps the
//! serialized payload under this process-wide key, with a fresh 16-byte
//! IV drawn per wrap.

use crate::error::{CryptoError, CryptoResult};
use crate::primitives::{aes_cbc_decrypt, aes_cbc_encrypt, random_bytes, AES_IV_SIZE};
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Master key length in bytes (AES-256).
pub const MASTER_KEY_SIZE: usize = 32;
/// Wrapping IV length in bytes.
pub const WRAP_IV_SIZE: usize = AES_IV_SIZE;

/// Process-lifetime master key. Immutable once constructed; share it as
/// `Arc<MasterKey>`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; MASTER_KEY_SIZE],
}

impl MasterKey {
    /// Loads the master key from configuration (64 hex chars), or
    /// generates an ephemeral one when unset.
    ///
    /// Generation is an operational hazard: ciphertext wrapped in a prior
    /// run cannot be decrypted. Production deployments must configure the
    /// key explicitly; the hazard is surfaced with a warning either way.
    pub fn from_config(configured_hex: Option<&str>) -> CryptoResult<Self> {
        match configured_hex {
            Some(h) => {
                let bytes = hex::decode(h.trim())
                    .map_err(|e| CryptoError::BadKey(format!("master key hex: {e}")))?;
                let key: [u8; MASTER_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
                    CryptoError::BadKey(format!(
                        "master key must be {MASTER_KEY_SIZE} bytes, got {}",
                        b.len()
                    ))
                })?;
                Ok(Self { key })
            }
            None => {
                let generated = random_bytes(MASTER_KEY_SIZE)?;
                let mut key = [0u8; MASTER_KEY_SIZE];
                key.copy_from_slice(&generated);
                warn!(
                    "no master key configured; generated an ephemeral one — \
                     ciphertext from prior runs cannot be decrypted"
                );
                Ok(Self { key })
            }
        }
    }

    pub fn from_bytes(key: [u8; MASTER_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Wraps a payload under the master key with a fresh IV.
    pub fn wrap(&self, payload: &[u8]) -> CryptoResult<([u8; WRAP_IV_SIZE], Vec<u8>)> {
        let iv_bytes = random_bytes(WRAP_IV_SIZE)?;
        let mut iv = [0u8; WRAP_IV_SIZE];
        iv.copy_from_slice(&iv_bytes);
        let wrapped = aes_cbc_encrypt(&self.key, &iv, payload)?;
        Ok((iv, wrapped))
    }

    /// Unwraps a payload. The result is zeroized when dropped.
    pub fn unwrap(&self, wrap_iv: &[u8], wrapped: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        aes_cbc_decrypt(&self.key, wrap_iv, wrapped).map(Zeroizing::new)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}
