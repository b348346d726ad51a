//! Pure, stateless primitives over byte arrays.

use crate::error::{CryptoError, CryptoResult};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use p256::ecdh;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use p256::{PublicKey, SecretKey};
use rand::RngCore;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// AES block / IV size in bytes.
pub const AES_IV_SIZE: usize = 16;
/// AES-GCM nonce size in bytes.
pub const GCM_NONCE_SIZE: usize = 12;
/// RSA modulus size in bits.
pub const RSA_BITS: usize = 2048;
/// Largest plaintext PKCS#1 v1.5 can carry under a 2048-bit modulus.
pub const RSA_MAX_PLAINTEXT: usize = RSA_BITS / 8 - 11;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A generated asymmetric keypair, PEM-encoded (SPKI public, PKCS#8 private).
#[derive(Clone)]
pub struct PemKeyPair {
    pub public_pem: String,
    pub private_pem: String,
}

/// Draws `n` bytes from the OS CSPRNG.
pub fn random_bytes(n: usize) -> CryptoResult<Vec<u8>> {
    let mut buf = vec![0u8; n];
    rand::rngs::OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::RngFailure(e.to_string()))?;
    Ok(buf)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// AES-CBC encryption with PKCS#7 padding. Key must be 16 or 32 bytes,
/// IV exactly 16.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_aes_iv(iv)?;
    match key.len() {
        16 => Ok(Aes128CbcEnc::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        32 => Ok(Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        n => Err(CryptoError::BadKey(format!(
            "AES key must be 16 or 32 bytes, got {n}"
        ))),
    }
}

/// AES-CBC decryption. Fails with `BadPadding` when the PKCS#7 check
/// fails — which is also what a wrong key produces.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_aes_iv(iv)?;
    match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::BadPadding),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::BadPadding),
        n => Err(CryptoError::BadKey(format!(
            "AES key must be 16 or 32 bytes, got {n}"
        ))),
    }
}

fn check_aes_iv(iv: &[u8]) -> CryptoResult<()> {
    if iv.len() != AES_IV_SIZE {
        return Err(CryptoError::BadKey(format!(
            "IV must be {AES_IV_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

/// AES-256-GCM encryption. The Poly-style auth tag is appended to the
/// returned ciphertext.
pub fn aes_gcm_encrypt(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    if nonce.len() != GCM_NONCE_SIZE {
        return Err(CryptoError::BadKey(format!(
            "GCM nonce must be {GCM_NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::BadKey("AES-GCM key must be 32 bytes".to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM seal failed: {e}")))
}

/// AES-256-GCM decryption; rejects any tampering via the auth tag.
pub fn aes_gcm_decrypt(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if nonce.len() != GCM_NONCE_SIZE {
        return Err(CryptoError::BadKey(format!(
            "GCM nonce must be {GCM_NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| CryptoError::BadKey("AES-GCM key must be 32 bytes".to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("AES-GCM open failed (wrong key or tampered data)".to_string()))
}

/// Generates a fresh RSA-2048 keypair.
pub fn rsa_generate_keypair() -> CryptoResult<PemKeyPair> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA_BITS)
        .map_err(|e| CryptoError::RngFailure(format!("RSA key generation: {e}")))?;
    let public = RsaPublicKey::from(&private);
    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::BadKey(format!("RSA private key encoding: {e}")))?
        .to_string();
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::BadKey(format!("RSA public key encoding: {e}")))?;
    Ok(PemKeyPair {
        public_pem,
        private_pem,
    })
}

/// RSA PKCS#1 v1.5 encryption. Plaintext is limited by the modulus;
/// callers enforce [`RSA_MAX_PLAINTEXT`] for a typed too-large error.
pub fn rsa_encrypt(public_key_pem: &str, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let public = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("RSA public key PEM: {e}")))?;
    public
        .encrypt(&mut rand::rngs::OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| CryptoError::Encryption(format!("RSA encrypt failed: {e}")))
}

pub fn rsa_decrypt(private_key_pem: &str, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let private = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("RSA private key PEM: {e}")))?;
    private
        .decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|_| CryptoError::BadPadding)
}

/// Generates a fresh P-256 keypair.
pub fn ecc_generate_keypair() -> CryptoResult<PemKeyPair> {
    let secret = SecretKey::random(&mut rand::rngs::OsRng);
    let public = secret.public_key();
    let private_pem = secret
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::BadKey(format!("EC private key encoding: {e}")))?
        .to_string();
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::BadKey(format!("EC public key encoding: {e}")))?;
    Ok(PemKeyPair {
        public_pem,
        private_pem,
    })
}

/// ECDSA over SHA-256 on P-256. Returns a fixed 64-byte signature.
pub fn ecdsa_sign(private_key_pem: &str, message: &[u8]) -> CryptoResult<Vec<u8>> {
    let secret = SecretKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC private key PEM: {e}")))?;
    let signing = SigningKey::from(&secret);
    let signature: Signature = signing.sign(message);
    Ok(signature.to_bytes().to_vec())
}

/// Verifies an ECDSA P-256 signature. A structurally invalid signature
/// is `BadSignature`; a well-formed but non-matching one is `Ok(false)`.
pub fn ecdsa_verify(public_key_pem: &str, message: &[u8], signature: &[u8]) -> CryptoResult<bool> {
    let public = PublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC public key PEM: {e}")))?;
    let verifying = VerifyingKey::from(&public);
    let signature = Signature::from_slice(signature).map_err(|_| CryptoError::BadSignature)?;
    Ok(verifying.verify(message, &signature).is_ok())
}

/// ECDH between a local private key and a peer public key, both PEM.
pub fn ecdh_agree(private_key_pem: &str, peer_public_pem: &str) -> CryptoResult<[u8; 32]> {
    let secret = SecretKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC private key PEM: {e}")))?;
    let peer = PublicKey::from_public_key_pem(peer_public_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC public key PEM: {e}")))?;
    Ok(shared_secret_bytes(&secret, &peer))
}

/// Result of an ephemeral ECDH agreement: the ephemeral public point
/// (SEC1 uncompressed, for the wire) and the shared secret.
pub struct EphemeralAgreement {
    pub public_sec1: Vec<u8>,
    pub shared_secret: [u8; 32],
}

/// Runs one side of a hybrid encryption: generates an ephemeral P-256
/// keypair and agrees with the recipient's public key. The ephemeral
/// secret never leaves this function.
pub fn ecdh_ephemeral_agree(recipient_public_pem: &str) -> CryptoResult<EphemeralAgreement> {
    let recipient = PublicKey::from_public_key_pem(recipient_public_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC public key PEM: {e}")))?;
    let secret = SecretKey::random(&mut rand::rngs::OsRng);
    let public_sec1 = secret
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();
    let shared_secret = shared_secret_bytes(&secret, &recipient);
    Ok(EphemeralAgreement {
        public_sec1,
        shared_secret,
    })
}

/// Recipient side of a hybrid decryption: agrees between the stored
/// private key and the ephemeral public point from the envelope.
/// Rejects points that are not on the curve.
pub fn ecdh_agree_with_point(
    private_key_pem: &str,
    peer_public_sec1: &[u8],
) -> CryptoResult<[u8; 32]> {
    let secret = SecretKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| CryptoError::BadKey(format!("EC private key PEM: {e}")))?;
    let peer = PublicKey::from_sec1_bytes(peer_public_sec1)
        .map_err(|_| CryptoError::BadKey("ephemeral public point is not on the curve".to_string()))?;
    Ok(shared_secret_bytes(&secret, &peer))
}

fn shared_secret_bytes(secret: &SecretKey, peer: &PublicKey) -> [u8; 32] {
    let shared = ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let mut out = [0u8; 32];
    out.copy_from_slice(shared.raw_secret_bytes().as_slice());
    out
}
