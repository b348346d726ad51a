//! Shared fixtures for core integration tests.

use chrono::Utc;
use privguard_core::{AnomalyConfig, CoreConfig, PrivacyCore};
use privguard_storage::NewUser;
use privguard_types::{Actor, AuditRecord, Role};
use std::time::Duration;

/// Fixed master key so wrapped material survives nothing but the test.
pub fn test_config() -> CoreConfig {
    CoreConfig {
        master_key_hex: Some("11".repeat(32)),
        master_iv_hex: None,
        anomaly: AnomalyConfig {
            // Full-day working hours: tests run at arbitrary local times
            // and must not trip the unusual_time detector.
            working_hours_start: 0,
            working_hours_end: 24,
            ..AnomalyConfig::default()
        },
    }
}

/// In-memory core with an administrator and two standard users.
pub fn core_with_users() -> (PrivacyCore, Actor, Actor, Actor) {
    let core = PrivacyCore::open_in_memory(test_config()).expect("core must open");
    let users = core.users();
    let admin = seed_user(&users, "root", Role::Administrator);
    let alice = seed_user(&users, "alice", Role::Standard);
    let bob = seed_user(&users, "bob", Role::Standard);
    (core, admin, alice, bob)
}

pub fn seed_user(users: &privguard_storage::UserStore, name: &str, role: Role) -> Actor {
    users
        .insert(&NewUser {
            username: name,
            email: None,
            full_name: None,
            role,
            created_at: Utc::now(),
        })
        .expect("user insert must succeed")
}

/// Polls `security_alerts` until at least one alert shows up or the
/// timeout passes — anomaly analysis runs on background tasks.
pub async fn wait_for_alerts(core: &PrivacyCore, actor: i64) -> Vec<AuditRecord> {
    for _ in 0..100 {
        let alerts = core
            .security_alerts(actor, None)
            .await
            .expect("alert query must succeed");
        if !alerts.is_empty() {
            return alerts;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Vec::new()
}
