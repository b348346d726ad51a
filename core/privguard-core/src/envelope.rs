//! Self-describing ciphertext envelopes.
//!
//! The wire form is colon-separated lowercase hex, one layout per
//! algorithm:
//!
//! | Algorithm   | Envelope                                  |
//! |-------------|-------------------------------------------|
//! | AES-*-CBC   | `<iv>:<ciphertext>`                       |
//! | AES-256-GCM | `<nonce>:<ciphertext+tag>`                |
//! | RSA-2048    | `<ciphertext>`                            |
//! | ECC-P256    | `<ephemeral public>:<iv>:<ciphertext>`    |
//!
//! A segment count that does not match the algorithm is rejected
//! outright; there is no heuristic repair.

use crate::error::{CoreError, CoreResult};
use privguard_types::KeyAlgorithm;

/// Parsed ciphertext envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiphertextEnvelope {
    AesCbc {
        iv: [u8; 16],
        ciphertext: Vec<u8>,
    },
    AesGcm {
        nonce: [u8; 12],
        ciphertext: Vec<u8>,
    },
    Rsa {
        ciphertext: Vec<u8>,
    },
    EccHybrid {
        /// SEC1-encoded ephemeral public point.
        ephemeral_public: Vec<u8>,
        iv: [u8; 16],
        ciphertext: Vec<u8>,
    },
}

impl CiphertextEnvelope {
    pub fn encode(&self) -> String {
        match self {
            CiphertextEnvelope::AesCbc { iv, ciphertext } => {
                format!("{}:{}", hex::encode(iv), hex::encode(ciphertext))
            }
            CiphertextEnvelope::AesGcm { nonce, ciphertext } => {
                format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext))
            }
            CiphertextEnvelope::Rsa { ciphertext } => hex::encode(ciphertext),
            CiphertextEnvelope::EccHybrid {
                ephemeral_public,
                iv,
                ciphertext,
            } => format!(
                "{}:{}:{}",
                hex::encode(ephemeral_public),
                hex::encode(iv),
                hex::encode(ciphertext)
            ),
        }
    }

    /// Parses an envelope for the given algorithm, enforcing the exact
    /// segment count.
    pub fn decode(algorithm: KeyAlgorithm, envelope: &str) -> CoreResult<Self> {
        let segments: Vec<&str> = envelope.split(':').collect();
        match algorithm {
            KeyAlgorithm::Aes128Cbc | KeyAlgorithm::Aes256Cbc => {
                let [iv, ciphertext] = two(&segments)?;
                Ok(CiphertextEnvelope::AesCbc {
                    iv: fixed_segment(iv)?,
                    ciphertext: data_segment(ciphertext)?,
                })
            }
            KeyAlgorithm::Aes256Gcm => {
                let [nonce, ciphertext] = two(&segments)?;
                Ok(CiphertextEnvelope::AesGcm {
                    nonce: fixed_segment(nonce)?,
                    ciphertext: data_segment(ciphertext)?,
                })
            }
            KeyAlgorithm::Rsa2048 => {
                if segments.len() != 1 {
                    return Err(CoreError::MalformedEnvelope);
                }
                Ok(CiphertextEnvelope::Rsa {
                    ciphertext: data_segment(segments[0])?,
                })
            }
            KeyAlgorithm::EccP256 => {
                if segments.len() != 3 {
                    return Err(CoreError::MalformedEnvelope);
                }
                Ok(CiphertextEnvelope::EccHybrid {
                    ephemeral_public: data_segment(segments[0])?,
                    iv: fixed_segment(segments[1])?,
                    ciphertext: data_segment(segments[2])?,
                })
            }
        }
    }
}

fn two<'a>(segments: &[&'a str]) -> CoreResult<[&'a str; 2]> {
    match segments {
        &[a, b] => Ok([a, b]),
        _ => Err(CoreError::MalformedEnvelope),
    }
}

fn fixed_segment<const N: usize>(segment: &str) -> CoreResult<[u8; N]> {
    let bytes = hex::decode(segment).map_err(|_| CoreError::MalformedEnvelope)?;
    bytes.try_into().map_err(|_| CoreError::MalformedEnvelope)
}

fn data_segment(segment: &str) -> CoreResult<Vec<u8>> {
    let bytes = hex::decode(segment).map_err(|_| CoreError::MalformedEnvelope)?;
    if bytes.is_empty() {
        return Err(CoreError::MalformedEnvelope);
    }
    Ok(bytes)
}
