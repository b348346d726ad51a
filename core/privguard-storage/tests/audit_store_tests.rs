use chrono::{Duration, Utc};
use privguard_storage::{AuditFilter, Database};
use privguard_types::{AuditAction, AuditEntry, AuditStatus};

fn entry(action: AuditAction, status: AuditStatus, actor: i64) -> AuditEntry {
    AuditEntry::new(action, status).with_actor(actor)
}

#[test]
fn append_stamps_strictly_increasing_ids() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();

    let mut last_id = 0;
    for _ in 0..10 {
        let rec = audit
            .append(&entry(AuditAction::DataEncrypt, AuditStatus::Success, 1), Utc::now())
            .unwrap();
        assert!(rec.id > last_id, "ids must strictly increase");
        last_id = rec.id;
    }
}

#[test]
fn append_preserves_details_map() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();

    let rec = audit
        .append(
            &entry(AuditAction::DataDecrypt, AuditStatus::Failed, 3)
                .with_resource("doc-7")
                .with_detail("error", "KeyNotActive"),
            Utc::now(),
        )
        .unwrap();

    let loaded = audit.query(&AuditFilter::default(), 10, 0).unwrap();
    let found = loaded.iter().find(|r| r.id == rec.id).unwrap();
    assert_eq!(found.error_detail(), Some("KeyNotActive"));
    assert_eq!(found.resource.as_deref(), Some("doc-7"));
}

#[test]
fn query_filters_by_actor_action_status() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();

    audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Success, 1), Utc::now()).unwrap();
    audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Failed, 1), Utc::now()).unwrap();
    audit.append(&entry(AuditAction::KeyGenerate, AuditStatus::Success, 2), Utc::now()).unwrap();

    let by_actor = AuditFilter { actor: Some(1), ..Default::default() };
    assert_eq!(audit.query(&by_actor, 10, 0).unwrap().len(), 2);

    let by_action = AuditFilter { action: Some(AuditAction::KeyGenerate), ..Default::default() };
    assert_eq!(audit.query(&by_action, 10, 0).unwrap().len(), 1);

    let failed_for_one = AuditFilter {
        actor: Some(1),
        status: Some(AuditStatus::Failed),
        ..Default::default()
    };
    assert_eq!(audit.count(&failed_for_one).unwrap(), 1);
}

#[test]
fn query_orders_newest_first_and_paginates() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();

    for _ in 0..5 {
        audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Success, 1), Utc::now()).unwrap();
    }

    let page1 = audit.query(&AuditFilter::default(), 2, 0).unwrap();
    let page2 = audit.query(&AuditFilter::default(), 2, 2).unwrap();
    assert_eq!(page1.len(), 2);
    assert_eq!(page2.len(), 2);
    assert!(page1[0].id > page1[1].id, "newest first");
    assert!(page1[1].id > page2[0].id, "pages do not overlap");
    assert_eq!(audit.count(&AuditFilter::default()).unwrap(), 5);
}

#[test]
fn recent_for_actor_respects_window_boundary() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();
    let now = Utc::now();

    audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Failed, 1), now - Duration::seconds(120)).unwrap();
    audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Failed, 1), now - Duration::seconds(10)).unwrap();
    audit.append(&entry(AuditAction::DataEncrypt, AuditStatus::Failed, 2), now).unwrap();

    let recent = audit.recent_for_actor(1, now - Duration::seconds(60)).unwrap();
    assert_eq!(recent.len(), 1, "only in-window rows for the actor");
}

#[test]
fn null_actor_rows_are_stored() {
    let db = Database::open_in_memory().unwrap();
    let audit = db.audit();

    let rec = audit
        .append(&AuditEntry::new(AuditAction::UserLogin, AuditStatus::Failed), Utc::now())
        .unwrap();
    assert!(rec.actor.is_none());

    let all = audit.query(&AuditFilter::default(), 10, 0).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].actor.is_none());
}
