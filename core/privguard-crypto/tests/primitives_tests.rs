use privguard_crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, aes_gcm_decrypt, aes_gcm_encrypt, ecc_generate_keypair,
    ecdh_agree, ecdh_agree_with_point, ecdh_ephemeral_agree, ecdsa_sign, ecdsa_verify,
    random_bytes, rsa_decrypt, rsa_encrypt, rsa_generate_keypair, sha256, CryptoError,
    RSA_MAX_PLAINTEXT,
};

// ── AES-CBC ──

#[test]
fn aes_cbc_roundtrip_128() {
    let key = random_bytes(16).unwrap();
    let iv = random_bytes(16).unwrap();
    let ct = aes_cbc_encrypt(&key, &iv, b"hello").unwrap();
    assert_eq!(aes_cbc_decrypt(&key, &iv, &ct).unwrap(), b"hello");
}

#[test]
fn aes_cbc_roundtrip_256() {
    let key = random_bytes(32).unwrap();
    let iv = random_bytes(16).unwrap();
    let plaintext = vec![0x5au8; 1024];
    let ct = aes_cbc_encrypt(&key, &iv, &plaintext).unwrap();
    assert_eq!(aes_cbc_decrypt(&key, &iv, &ct).unwrap(), plaintext);
}

#[test]
fn aes_cbc_empty_plaintext_roundtrips() {
    let key = random_bytes(32).unwrap();
    let iv = random_bytes(16).unwrap();
    let ct = aes_cbc_encrypt(&key, &iv, b"").unwrap();
    // PKCS#7 pads the empty message to one full block
    assert_eq!(ct.len(), 16);
    assert_eq!(aes_cbc_decrypt(&key, &iv, &ct).unwrap(), b"");
}

#[test]
fn aes_cbc_rejects_bad_key_length() {
    let iv = random_bytes(16).unwrap();
    let err = aes_cbc_encrypt(&[0u8; 24], &iv, b"data").unwrap_err();
    assert!(matches!(err, CryptoError::BadKey(_)), "got: {err:?}");
}

#[test]
fn aes_cbc_rejects_bad_iv_length() {
    let key = random_bytes(32).unwrap();
    let err = aes_cbc_encrypt(&key, &[0u8; 12], b"data").unwrap_err();
    assert!(matches!(err, CryptoError::BadKey(_)));
}

#[test]
fn aes_cbc_wrong_key_fails_padding_check() {
    let key_a = random_bytes(32).unwrap();
    let key_b = random_bytes(32).unwrap();
    let iv = random_bytes(16).unwrap();

    // A single block of random padding surviving a wrong-key decrypt is
    // a ~1/255 event; a longer message makes the check effectively certain.
    let ct = aes_cbc_encrypt(&key_a, &iv, &vec![7u8; 256]).unwrap();
    let result = aes_cbc_decrypt(&key_b, &iv, &ct);
    if let Err(e) = result {
        assert!(matches!(e, CryptoError::BadPadding), "got: {e:?}");
    }
}

#[test]
fn aes_cbc_truncated_ciphertext_rejected() {
    let key = random_bytes(32).unwrap();
    let iv = random_bytes(16).unwrap();
    let ct = aes_cbc_encrypt(&key, &iv, b"some plaintext that spans blocks").unwrap();
    assert!(aes_cbc_decrypt(&key, &iv, &ct[..ct.len() - 1]).is_err());
}

// ── AES-GCM ──

#[test]
fn aes_gcm_roundtrip() {
    let key = random_bytes(32).unwrap();
    let nonce = random_bytes(12).unwrap();
    let ct = aes_gcm_encrypt(&key, &nonce, b"authenticated payload").unwrap();
    assert_eq!(
        aes_gcm_decrypt(&key, &nonce, &ct).unwrap(),
        b"authenticated payload"
    );
}

#[test]
fn aes_gcm_detects_tampering() {
    let key = random_bytes(32).unwrap();
    let nonce = random_bytes(12).unwrap();
    let mut ct = aes_gcm_encrypt(&key, &nonce, b"integrity matters").unwrap();
    ct[0] ^= 0x01;
    let err = aes_gcm_decrypt(&key, &nonce, &ct).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

#[test]
fn aes_gcm_rejects_short_key() {
    let nonce = random_bytes(12).unwrap();
    assert!(matches!(
        aes_gcm_encrypt(&[0u8; 16], &nonce, b"x").unwrap_err(),
        CryptoError::BadKey(_)
    ));
}

// ── RSA ──

#[test]
fn rsa_roundtrip() {
    let pair = rsa_generate_keypair().unwrap();
    let ct = rsa_encrypt(&pair.public_pem, b"short secret").unwrap();
    assert_eq!(rsa_decrypt(&pair.private_pem, &ct).unwrap(), b"short secret");
}

#[test]
fn rsa_max_plaintext_boundary() {
    let pair = rsa_generate_keypair().unwrap();
    let at_limit = vec![1u8; RSA_MAX_PLAINTEXT];
    let ct = rsa_encrypt(&pair.public_pem, &at_limit).unwrap();
    assert_eq!(rsa_decrypt(&pair.private_pem, &ct).unwrap(), at_limit);

    // One past the limit is rejected by the padding layer
    let over = vec![1u8; RSA_MAX_PLAINTEXT + 1];
    assert!(rsa_encrypt(&pair.public_pem, &over).is_err());
}

#[test]
fn rsa_wrong_key_fails() {
    let pair_a = rsa_generate_keypair().unwrap();
    let pair_b = rsa_generate_keypair().unwrap();
    let ct = rsa_encrypt(&pair_a.public_pem, b"secret").unwrap();
    let err = rsa_decrypt(&pair_b.private_pem, &ct).unwrap_err();
    assert!(matches!(err, CryptoError::BadPadding));
}

#[test]
fn rsa_malformed_pem_rejected() {
    let err = rsa_encrypt("not a pem at all", b"data").unwrap_err();
    assert!(matches!(err, CryptoError::BadKey(_)));
}

// ── ECDSA ──

#[test]
fn ecdsa_sign_verify() {
    let pair = ecc_generate_keypair().unwrap();
    let sig = ecdsa_sign(&pair.private_pem, b"message to sign").unwrap();
    assert_eq!(sig.len(), 64);
    assert!(ecdsa_verify(&pair.public_pem, b"message to sign", &sig).unwrap());
}

#[test]
fn ecdsa_rejects_modified_message() {
    let pair = ecc_generate_keypair().unwrap();
    let sig = ecdsa_sign(&pair.private_pem, b"original").unwrap();
    assert!(!ecdsa_verify(&pair.public_pem, b"tampered", &sig).unwrap());
}

#[test]
fn ecdsa_rejects_wrong_signer() {
    let pair_a = ecc_generate_keypair().unwrap();
    let pair_b = ecc_generate_keypair().unwrap();
    let sig = ecdsa_sign(&pair_a.private_pem, b"message").unwrap();
    assert!(!ecdsa_verify(&pair_b.public_pem, b"message", &sig).unwrap());
}

#[test]
fn ecdsa_garbage_signature_is_bad_signature() {
    let pair = ecc_generate_keypair().unwrap();
    let err = ecdsa_verify(&pair.public_pem, b"message", &[0u8; 10]).unwrap_err();
    assert!(matches!(err, CryptoError::BadSignature));
}

// ── ECDH ──

#[test]
fn ecdh_both_sides_agree() {
    let alice = ecc_generate_keypair().unwrap();
    let bob = ecc_generate_keypair().unwrap();

    let from_alice = ecdh_agree(&alice.private_pem, &bob.public_pem).unwrap();
    let from_bob = ecdh_agree(&bob.private_pem, &alice.public_pem).unwrap();
    assert_eq!(from_alice, from_bob);
}

#[test]
fn ephemeral_agreement_matches_recipient_side() {
    let recipient = ecc_generate_keypair().unwrap();
    let agreement = ecdh_ephemeral_agree(&recipient.public_pem).unwrap();

    let recovered =
        ecdh_agree_with_point(&recipient.private_pem, &agreement.public_sec1).unwrap();
    assert_eq!(recovered, agreement.shared_secret);
}

#[test]
fn ephemeral_agreements_use_distinct_keys() {
    let recipient = ecc_generate_keypair().unwrap();
    let a = ecdh_ephemeral_agree(&recipient.public_pem).unwrap();
    let b = ecdh_ephemeral_agree(&recipient.public_pem).unwrap();
    assert_ne!(a.public_sec1, b.public_sec1);
    assert_ne!(a.shared_secret, b.shared_secret);
}

#[test]
fn off_curve_point_rejected() {
    let recipient = ecc_generate_keypair().unwrap();
    // 65 bytes with the uncompressed tag but coordinates not on the curve
    let mut bogus = vec![0x04u8];
    bogus.extend_from_slice(&[0xffu8; 64]);
    let err = ecdh_agree_with_point(&recipient.private_pem, &bogus).unwrap_err();
    assert!(matches!(err, CryptoError::BadKey(_)));
}

// ── Hash and RNG ──

#[test]
fn sha256_known_vector() {
    // SHA-256("abc")
    let digest = sha256(b"abc");
    assert_eq!(
        hex::encode(digest),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn random_bytes_length_and_variation() {
    let a = random_bytes(32).unwrap();
    let b = random_bytes(32).unwrap();
    assert_eq!(a.len(), 32);
    assert_ne!(a, b);
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn aes_cbc_always_roundtrips(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            use_256 in any::<bool>(),
        ) {
            let key = random_bytes(if use_256 { 32 } else { 16 }).unwrap();
            let iv = random_bytes(16).unwrap();
            let ct = aes_cbc_encrypt(&key, &iv, &plaintext).unwrap();
            prop_assert_eq!(aes_cbc_decrypt(&key, &iv, &ct).unwrap(), plaintext);
        }

        #[test]
        fn aes_gcm_always_roundtrips(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = random_bytes(32).unwrap();
            let nonce = random_bytes(12).unwrap();
            let ct = aes_gcm_encrypt(&key, &nonce, &plaintext).unwrap();
            prop_assert_eq!(aes_gcm_decrypt(&key, &nonce, &ct).unwrap(), plaintext);
        }
    }
}
