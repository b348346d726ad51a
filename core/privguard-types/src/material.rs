//! Unwrapped key material — the algorithm-specific payload stored under
//! the master key.
//!
//! The serialized form is a tagged JSON record so the payload is
//! self-describing independent of the key row it came from. Material is
//! zeroized on drop; it must never leave the engine boundary.

use crate::KeyAlgorithm;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Algorithm-specific key payload.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KeyMaterial {
    /// Single symmetric key, 16 or 32 bytes.
    Aes { key: Vec<u8> },
    /// SPKI public + PKCS#8 private key, PEM-encoded.
    Rsa {
        #[serde(rename = "publicKey")]
        public_pem: String,
        #[serde(rename = "privateKey")]
        private_pem: String,
    },
    /// SPKI public + PKCS#8 private key on P-256, PEM-encoded.
    Ecc {
        #[serde(rename = "publicKey")]
        public_pem: String,
        #[serde(rename = "privateKey")]
        private_pem: String,
    },
}

impl KeyMaterial {
    /// Checks that this payload is structurally valid for the given
    /// algorithm (invariant (b) on key records).
    pub fn matches(&self, algorithm: KeyAlgorithm) -> bool {
        match (self, algorithm) {
            (KeyMaterial::Aes { key }, alg) => alg.aes_key_len() == Some(key.len()),
            (KeyMaterial::Rsa { .. }, KeyAlgorithm::Rsa2048) => true,
            (KeyMaterial::Ecc { .. }, KeyAlgorithm::EccP256) => true,
            _ => false,
        }
    }

    /// Canonical serialized form, as wrapped under the master key.
    pub fn to_canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_canonical_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// Manual Debug so key bytes and private PEMs never land in logs.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMaterial::Aes { key } => f
                .debug_struct("KeyMaterial::Aes")
                .field("key_len", &key.len())
                .finish_non_exhaustive(),
            KeyMaterial::Rsa { .. } => f.debug_struct("KeyMaterial::Rsa").finish_non_exhaustive(),
            KeyMaterial::Ecc { .. } => f.debug_struct("KeyMaterial::Ecc").finish_non_exhaustive(),
        }
    }
}
