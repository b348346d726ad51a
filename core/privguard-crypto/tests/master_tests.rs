use privguard_crypto::{CryptoError, MasterKey, MASTER_KEY_SIZE, WRAP_IV_SIZE};

#[test]
fn wrap_unwrap_roundtrip() {
    let master = MasterKey::from_bytes([7u8; MASTER_KEY_SIZE]);
    let payload = br#"{"kind":"aes","key":[1,2,3]}"#;

    let (iv, wrapped) = master.wrap(payload).unwrap();
    assert_eq!(iv.len(), WRAP_IV_SIZE);
    assert_ne!(&wrapped[..], &payload[..]);

    let unwrapped = master.unwrap(&iv, &wrapped).unwrap();
    assert_eq!(&unwrapped[..], &payload[..]);
}

#[test]
fn each_wrap_draws_a_fresh_iv() {
    let master = MasterKey::from_bytes([7u8; MASTER_KEY_SIZE]);
    let (iv1, ct1) = master.wrap(b"same payload").unwrap();
    let (iv2, ct2) = master.wrap(b"same payload").unwrap();
    assert_ne!(iv1, iv2);
    assert_ne!(ct1, ct2);
}

#[test]
fn unwrap_with_wrong_master_key_fails() {
    let master_a = MasterKey::from_bytes([1u8; MASTER_KEY_SIZE]);
    let master_b = MasterKey::from_bytes([2u8; MASTER_KEY_SIZE]);

    let payload = vec![0xabu8; 128];
    let (iv, wrapped) = master_a.wrap(&payload).unwrap();
    assert!(master_b.unwrap(&iv, &wrapped).is_err());
}

#[test]
fn from_config_parses_hex() {
    let hex_key = "00".repeat(MASTER_KEY_SIZE);
    let master = MasterKey::from_config(Some(&hex_key)).unwrap();
    let (iv, wrapped) = master.wrap(b"payload").unwrap();
    assert_eq!(&master.unwrap(&iv, &wrapped).unwrap()[..], b"payload");
}

#[test]
fn from_config_accepts_surrounding_whitespace() {
    let hex_key = format!("  {}\n", "ab".repeat(MASTER_KEY_SIZE));
    assert!(MasterKey::from_config(Some(&hex_key)).is_ok());
}

#[test]
fn from_config_rejects_wrong_length() {
    let err = MasterKey::from_config(Some("deadbeef")).unwrap_err();
    assert!(matches!(err, CryptoError::BadKey(_)), "got: {err:?}");
}

#[test]
fn from_config_rejects_non_hex() {
    let not_hex = "zz".repeat(MASTER_KEY_SIZE);
    assert!(MasterKey::from_config(Some(&not_hex)).is_err());
}

#[test]
fn from_config_generates_when_unset() {
    // Two generated keys must differ; their ciphertexts are mutually
    // undecryptable, which is exactly the durability hazard the warning
    // is about.
    let master_a = MasterKey::from_config(None).unwrap();
    let master_b = MasterKey::from_config(None).unwrap();

    let (iv, wrapped) = master_a.wrap(&vec![9u8; 64]).unwrap();
    assert!(master_b.unwrap(&iv, &wrapped).is_err());
}
