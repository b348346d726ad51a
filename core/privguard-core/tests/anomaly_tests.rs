//! Detector behavior over seeded operation and audit streams.

use chrono::{Duration, Utc};
use privguard_core::{AnomalyConfig, AnomalyDetector, AnomalyKind, AnomalySeverity, AuditRecorder};
use privguard_storage::{AuditFilter, Database, NewOperation};
use privguard_types::{
    AuditAction, AuditEntry, AuditStatus, KeyAlgorithm, OperationKind, OperationOutcome,
    OperationRecord,
};

const ACTOR: i64 = 1;

fn full_day_config() -> AnomalyConfig {
    AnomalyConfig {
        working_hours_start: 0,
        working_hours_end: 24,
        ..AnomalyConfig::default()
    }
}

fn detector(db: &Database, config: AnomalyConfig) -> AnomalyDetector {
    AnomalyDetector::new(
        config,
        db.operations(),
        db.audit(),
        AuditRecorder::new(db.audit()),
    )
}

fn seed_ops(db: &Database, count: usize) {
    let ops = db.operations();
    for _ in 0..count {
        ops.insert(&NewOperation {
            actor: ACTOR,
            key_internal_id: Some(1),
            kind: OperationKind::Encrypt,
            algorithm: KeyAlgorithm::Aes256Cbc,
            resource_label: None,
            outcome: OperationOutcome::Success,
            timestamp: Utc::now(),
        })
        .unwrap();
    }
}

fn seed_failed_audits(db: &Database, count: usize, error: &str) {
    let audit = db.audit();
    for _ in 0..count {
        audit
            .append(
                &AuditEntry::new(AuditAction::DataDecrypt, AuditStatus::Failed)
                    .with_actor(ACTOR)
                    .with_detail("error", error),
                Utc::now(),
            )
            .unwrap();
    }
}

#[tokio::test]
async fn quiet_actor_produces_no_anomaly() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());
    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn high_volume_fires_over_threshold() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    seed_ops(&db, 21);
    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::HighVolume);
    assert_eq!(anomaly.severity, AnomalySeverity::Medium);
}

#[tokio::test]
async fn at_threshold_does_not_fire() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    seed_ops(&db, 20);
    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn high_volume_wins_over_other_detectors() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    // Both volume and failure conditions hold; fixed order returns volume
    seed_ops(&db, 25);
    seed_failed_audits(&db, 15, "KeyNotActive");

    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::HighVolume);
}

#[tokio::test]
async fn high_failure_rate_fires_on_ratio() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    // 3 failures out of 5 total operations: 0.6 >= 0.30
    seed_ops(&db, 2);
    seed_failed_audits(&db, 3, "BadPadding");

    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::HighFailureRate);
    assert_eq!(anomaly.severity, AnomalySeverity::High);
}

#[tokio::test]
async fn low_failure_ratio_stays_quiet() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    // 1 failure out of 11: under the 0.30 threshold
    seed_ops(&db, 10);
    seed_failed_audits(&db, 1, "BadPadding");

    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn revoked_key_usage_fires_on_repeated_attempts() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(
        &db,
        AnomalyConfig {
            // Push the ratio detector out of reach so this test isolates
            // the revoked-key detector.
            failure_ratio_threshold: 2.0,
            ..full_day_config()
        },
    );

    seed_failed_audits(&db, 2, "KeyNotActive");
    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::RevokedKeyUsage);
    assert_eq!(anomaly.severity, AnomalySeverity::High);
}

#[tokio::test]
async fn other_failure_kinds_do_not_count_as_revoked_usage() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(
        &db,
        AnomalyConfig {
            failure_ratio_threshold: 2.0,
            ..full_day_config()
        },
    );

    seed_failed_audits(&db, 5, "MalformedEnvelope");
    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn unusual_time_fires_outside_working_hours() {
    let db = Database::open_in_memory().unwrap();
    // Empty working window: every operation is outside it
    let det = detector(
        &db,
        AnomalyConfig {
            working_hours_start: 12,
            working_hours_end: 12,
            ..AnomalyConfig::default()
        },
    );

    seed_ops(&db, 1);
    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::UnusualTime);
    assert_eq!(anomaly.severity, AnomalySeverity::Low);
}

#[tokio::test]
async fn detector_ignores_its_own_emissions() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(
        &db,
        AnomalyConfig {
            failure_ratio_threshold: 2.0,
            ..full_day_config()
        },
    );

    // Adversarially shaped rows: ANOMALY_DETECTED with the markers the
    // revoked-key detector matches on. They must be excluded.
    let audit = db.audit();
    for _ in 0..5 {
        audit
            .append(
                &AuditEntry::new(AuditAction::AnomalyDetected, AuditStatus::Failed)
                    .with_actor(ACTOR)
                    .with_detail("error", "KeyNotActive"),
                Utc::now(),
            )
            .unwrap();
    }

    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_operations_fall_out_of_the_window() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    let ops = db.operations();
    for _ in 0..30 {
        ops.insert(&NewOperation {
            actor: ACTOR,
            key_internal_id: Some(1),
            kind: OperationKind::Encrypt,
            algorithm: KeyAlgorithm::Aes256Cbc,
            resource_label: None,
            outcome: OperationOutcome::Success,
            timestamp: Utc::now() - Duration::seconds(300),
        })
        .unwrap();
    }

    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn observe_feeds_cache_and_reset_drops_it() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    // Operations live only in the cache, not the store
    for i in 0..21 {
        det.observe(OperationRecord {
            id: i,
            actor: ACTOR,
            key_internal_id: Some(1),
            kind: OperationKind::Encrypt,
            algorithm: KeyAlgorithm::Aes256Cbc,
            resource_label: None,
            outcome: OperationOutcome::Success,
            timestamp: Utc::now(),
        })
        .await;
    }

    let anomaly = det.analyze(ACTOR).await.unwrap().unwrap();
    assert_eq!(anomaly.kind, AnomalyKind::HighVolume);

    det.reset(ACTOR).await;
    assert!(det.analyze(ACTOR).await.unwrap().is_none());
}

#[tokio::test]
async fn scan_records_a_warning_audit_row() {
    let db = Database::open_in_memory().unwrap();
    let det = detector(&db, full_day_config());

    seed_ops(&db, 25);
    det.scan(ACTOR).await;

    let filter = AuditFilter {
        actor: Some(ACTOR),
        action: Some(AuditAction::AnomalyDetected),
        status: Some(AuditStatus::Warning),
    };
    let alerts = db.audit().query(&filter, 10, 0).unwrap();
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.resource.as_deref(), Some("high_volume"));
    assert_eq!(alert.details.get("type").and_then(|v| v.as_str()), Some("high_volume"));
    assert_eq!(alert.details.get("severity").and_then(|v| v.as_str()), Some("medium"));
}
