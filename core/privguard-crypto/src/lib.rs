//! Cryptographic primitive layer for PrivGuard.
//!
//! Provides the raw operations the crypto engine dispatches over:
//! - AES-CBC (PKCS#7) and AES-256-GCM over byte payloads
//! - RSA-2048 with PKCS#1 v1.5 padding
//! - ECDSA and ECDH on P-256, with PEM (SPKI/PKCS#8) key encoding
//! - SHA-256 and an OS CSPRNG
//!
//! plus the envelope wrapper: a process-lifetime [`MasterKey`] that wraps
//! key material with a fresh IV per call.
//!
//! All functions here are pure and stateless; key parsing goes through
//! audited PKCS#8/SPKI implementations, never hand-rolled ASN.1 scans.

mod error;
mod master;
mod primitives;

pub use error::{CryptoError, CryptoResult};
pub use master::{MasterKey, MASTER_KEY_SIZE, WRAP_IV_SIZE};
pub use primitives::{
    aes_cbc_decrypt, aes_cbc_encrypt, aes_gcm_decrypt, aes_gcm_encrypt, ecc_generate_keypair,
    ecdh_agree, ecdh_agree_with_point, ecdh_ephemeral_agree, ecdsa_sign, ecdsa_verify,
    random_bytes, rsa_decrypt, rsa_encrypt, rsa_generate_keypair, sha256, EphemeralAgreement,
    PemKeyPair, AES_IV_SIZE, GCM_NONCE_SIZE, RSA_BITS, RSA_MAX_PLAINTEXT,
};
