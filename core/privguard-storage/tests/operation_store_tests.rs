use chrono::{Duration, Utc};
use privguard_storage::{Database, NewOperation};
use privguard_types::{KeyAlgorithm, OperationKind, OperationOutcome};

fn op(actor: i64, ts: chrono::DateTime<Utc>) -> NewOperation<'static> {
    NewOperation {
        actor,
        key_internal_id: Some(1),
        kind: OperationKind::Encrypt,
        algorithm: KeyAlgorithm::Aes128Cbc,
        resource_label: Some("report.pdf"),
        outcome: OperationOutcome::Success,
        timestamp: ts,
    }
}

#[test]
fn insert_assigns_ids_and_roundtrips() {
    let db = Database::open_in_memory().unwrap();
    let ops = db.operations();

    let rec = ops.insert(&op(1, Utc::now())).unwrap();
    assert!(rec.id > 0);

    let listed = ops.list_for_actor(1, 10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].resource_label.as_deref(), Some("report.pdf"));
    assert_eq!(listed[0].kind, OperationKind::Encrypt);
    assert_eq!(listed[0].outcome, OperationOutcome::Success);
}

#[test]
fn list_for_actor_newest_first_with_limit() {
    let db = Database::open_in_memory().unwrap();
    let ops = db.operations();

    for i in 0..5 {
        ops.insert(&op(1, Utc::now() + Duration::milliseconds(i))).unwrap();
    }
    ops.insert(&op(2, Utc::now())).unwrap();

    let listed = ops.list_for_actor(1, 3).unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed[0].id > listed[1].id && listed[1].id > listed[2].id);
}

#[test]
fn recent_for_actor_cuts_at_window() {
    let db = Database::open_in_memory().unwrap();
    let ops = db.operations();
    let now = Utc::now();

    ops.insert(&op(1, now - Duration::seconds(90))).unwrap();
    ops.insert(&op(1, now - Duration::seconds(30))).unwrap();
    ops.insert(&op(1, now)).unwrap();

    let recent = ops.recent_for_actor(1, now - Duration::seconds(60)).unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent[0].id < recent[1].id, "oldest first");
}
