use chrono::{Duration, Utc};
use privguard_storage::{Database, NewKey};
use privguard_types::{KeyAlgorithm, KeyStatus};

fn sample_key<'a>(public_id: &'a str, owner: i64) -> NewKey<'a> {
    NewKey {
        name: "test key",
        owner,
        public_id,
        algorithm: KeyAlgorithm::Aes256Cbc,
        wrapped_material: b"opaque-wrapped-bytes",
        wrap_iv: &[9u8; 16],
        status: KeyStatus::Active,
        created_at: Utc::now(),
        expires_at: None,
    }
}

#[test]
fn insert_assigns_monotonic_ids() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();

    let first = keys.insert(&sample_key("K-1-aaaa", 1)).unwrap();
    let second = keys.insert(&sample_key("K-2-bbbb", 1)).unwrap();
    assert!(second.internal_id > first.internal_id);
}

#[test]
fn get_roundtrips_all_fields() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();

    let inserted = keys.insert(&sample_key("K-3-cccc", 42)).unwrap();
    let loaded = keys.get(inserted.internal_id).unwrap().unwrap();

    assert_eq!(loaded.public_id, "K-3-cccc");
    assert_eq!(loaded.owner, 42);
    assert_eq!(loaded.algorithm, KeyAlgorithm::Aes256Cbc);
    assert_eq!(loaded.status, KeyStatus::Active);
    assert_eq!(loaded.wrapped_material, b"opaque-wrapped-bytes");
    assert_eq!(loaded.wrap_iv, [9u8; 16]);
    assert!(loaded.last_used_at.is_none());
}

#[test]
fn get_missing_returns_none() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.keys().get(999).unwrap().is_none());
}

#[test]
fn get_by_public_id_finds_key() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();
    keys.insert(&sample_key("K-4-dddd", 1)).unwrap();

    assert!(keys.get_by_public_id("K-4-dddd").unwrap().is_some());
    assert!(keys.get_by_public_id("K-0-zzzz").unwrap().is_none());
}

#[test]
fn duplicate_public_id_rejected() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();
    keys.insert(&sample_key("K-5-eeee", 1)).unwrap();
    assert!(keys.insert(&sample_key("K-5-eeee", 2)).is_err());
}

#[test]
fn list_for_owner_excludes_other_owners() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();
    keys.insert(&sample_key("K-6-ffff", 1)).unwrap();
    keys.insert(&sample_key("K-7-0000", 1)).unwrap();
    keys.insert(&sample_key("K-8-1111", 2)).unwrap();

    assert_eq!(keys.list_for_owner(1).unwrap().len(), 2);
    assert_eq!(keys.list_for_owner(2).unwrap().len(), 1);
    assert_eq!(keys.list_all().unwrap().len(), 3);
}

#[test]
fn set_status_updates_status_and_updated_at() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();
    let key = keys.insert(&sample_key("K-9-2222", 1)).unwrap();

    let later = key.created_at + Duration::seconds(5);
    keys.set_status(key.internal_id, KeyStatus::Revoked, later).unwrap();

    let loaded = keys.get(key.internal_id).unwrap().unwrap();
    assert_eq!(loaded.status, KeyStatus::Revoked);
    assert!(loaded.updated_at > loaded.created_at);
}

#[test]
fn touch_last_used_never_moves_backwards() {
    let db = Database::open_in_memory().unwrap();
    let keys = db.keys();
    let key = keys.insert(&sample_key("K-10-3333", 1)).unwrap();

    let t1 = Utc::now();
    let t0 = t1 - Duration::seconds(30);

    keys.touch_last_used(key.internal_id, t1).unwrap();
    // A racing caller with an older clock reading must not regress the value
    keys.touch_last_used(key.internal_id, t0).unwrap();

    let loaded = keys.get(key.internal_id).unwrap().unwrap();
    let last_used = loaded.last_used_at.unwrap();
    assert_eq!(last_used.timestamp_millis(), t1.timestamp_millis());
}

#[test]
fn keys_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("privguard.db");

    {
        let db = Database::open(&path).unwrap();
        db.keys().insert(&sample_key("K-11-4444", 7)).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let loaded = db.keys().get_by_public_id("K-11-4444").unwrap().unwrap();
    assert_eq!(loaded.owner, 7);
}
