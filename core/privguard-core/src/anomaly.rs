//! Online anomaly detector.
//!
//! Keeps a per-actor sliding cache of recent operations (fed by the
//! engine after each success) and evaluates a fixed-order battery of
//! detectors over that cache plus the failure side of the audit stream.
//! The detector's own `ANOMALY_DETECTED` rows are excluded from its
//! audit scan so it never feeds back on itself.
//!
//! Analysis runs on background tasks after the primary result is
//! decided; failures here log and never surface to callers.

use crate::audit::AuditRecorder;
use crate::config::AnomalyConfig;
use crate::error::CoreResult;
use chrono::{Duration, Timelike, Utc};
use privguard_storage::{AuditStore, OperationStore};
use privguard_types::{AuditAction, AuditEntry, AuditRecord, AuditStatus, OperationRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "low"),
            AnomalySeverity::Medium => write!(f, "medium"),
            AnomalySeverity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    HighVolume,
    HighFailureRate,
    RevokedKeyUsage,
    UnusualTime,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::HighVolume => write!(f, "high_volume"),
            AnomalyKind::HighFailureRate => write!(f, "high_failure_rate"),
            AnomalyKind::RevokedKeyUsage => write!(f, "revoked_key_usage"),
            AnomalyKind::UnusualTime => write!(f, "unusual_time"),
        }
    }
}

/// A detector hit for one actor.
#[derive(Debug, Clone)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub actor: i64,
    pub detail: String,
}

/// Sliding-window detector over the operations and audit streams.
pub struct AnomalyDetector {
    config: AnomalyConfig,
    operations: OperationStore,
    audit: AuditStore,
    recorder: AuditRecorder,
    /// Per-actor cache of recent operations; process lifetime, dropped
    /// on [`reset`](Self::reset).
    cache: Arc<RwLock<HashMap<i64, Vec<OperationRecord>>>>,
}

impl AnomalyDetector {
    pub fn new(
        config: AnomalyConfig,
        operations: OperationStore,
        audit: AuditStore,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            config,
            operations,
            audit,
            recorder,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    /// Feeds one successful operation into the actor's sliding cache.
    pub async fn observe(&self, record: OperationRecord) {
        let horizon = Utc::now() - self.window();
        let mut cache = self.cache.write().await;
        let ops = cache.entry(record.actor).or_default();
        ops.push(record);
        ops.retain(|op| op.timestamp >= horizon);
    }

    /// Evaluates the detectors for one actor; first hit wins. Takes a
    /// snapshot of the cache up front so no lock is held across the scan.
    pub async fn analyze(&self, actor: i64) -> CoreResult<Option<Anomaly>> {
        let since = Utc::now() - self.window();

        let mut ops: Vec<OperationRecord> = {
            let cache = self.cache.read().await;
            cache.get(&actor).cloned().unwrap_or_default()
        };
        ops.retain(|op| op.timestamp >= since);
        if ops.is_empty() {
            // Cold cache (fresh process): rebuild the window from the store.
            ops = self.operations.recent_for_actor(actor, since)?;
        }

        let audits: Vec<AuditRecord> = self
            .audit
            .recent_for_actor(actor, since)?
            .into_iter()
            .filter(|r| r.action != AuditAction::AnomalyDetected)
            .collect();

        Ok(self
            .high_volume(actor, &ops)
            .or_else(|| self.high_failure_rate(actor, &ops, &audits))
            .or_else(|| self.revoked_key_usage(actor, &audits))
            .or_else(|| self.unusual_time(actor, &ops)))
    }

    /// Writes an `ANOMALY_DETECTED` warning row for a hit.
    pub fn record(&self, anomaly: &Anomaly) -> CoreResult<AuditRecord> {
        self.recorder.record(
            AuditEntry::new(AuditAction::AnomalyDetected, AuditStatus::Warning)
                .with_actor(anomaly.actor)
                .with_resource(anomaly.kind.to_string())
                .with_detail("type", anomaly.kind.to_string())
                .with_detail("severity", anomaly.severity.to_string())
                .with_detail("detail", anomaly.detail.clone()),
        )
    }

    /// Fire-and-forget entry point for background tasks: analyze, record
    /// any hit, swallow (but log) every failure.
    pub async fn scan(&self, actor: i64) {
        match self.analyze(actor).await {
            Ok(Some(anomaly)) => {
                warn!(
                    actor,
                    kind = %anomaly.kind,
                    severity = %anomaly.severity,
                    "anomaly detected: {}",
                    anomaly.detail
                );
                if let Err(e) = self.record(&anomaly) {
                    warn!("failed to record anomaly for actor {actor}: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => warn!("anomaly analysis failed for actor {actor}: {e}"),
        }
    }

    /// Drops the actor's cached window.
    pub async fn reset(&self, actor: i64) {
        self.cache.write().await.remove(&actor);
    }

    fn high_volume(&self, actor: i64, ops: &[OperationRecord]) -> Option<Anomaly> {
        (ops.len() > self.config.max_ops_per_window).then(|| Anomaly {
            kind: AnomalyKind::HighVolume,
            severity: AnomalySeverity::Medium,
            actor,
            detail: format!(
                "{} operations in the last {}s (limit {})",
                ops.len(),
                self.config.window_secs,
                self.config.max_ops_per_window
            ),
        })
    }

    fn high_failure_rate(
        &self,
        actor: i64,
        ops: &[OperationRecord],
        audits: &[AuditRecord],
    ) -> Option<Anomaly> {
        let failed = audits
            .iter()
            .filter(|r| r.action.is_data_action() && r.status == AuditStatus::Failed)
            .count();
        if failed == 0 {
            return None;
        }
        let total = ops.len() + failed;
        let ratio = failed as f64 / total as f64;
        (ratio >= self.config.failure_ratio_threshold).then(|| Anomaly {
            kind: AnomalyKind::HighFailureRate,
            severity: AnomalySeverity::High,
            actor,
            detail: format!("{failed} of {total} data operations failed in the window"),
        })
    }

    fn revoked_key_usage(&self, actor: i64, audits: &[AuditRecord]) -> Option<Anomaly> {
        let attempts = audits
            .iter()
            .filter(|r| {
                r.status == AuditStatus::Failed
                    && r.error_detail().is_some_and(|e| e == "KeyNotActive")
            })
            .count();
        (attempts >= self.config.revoked_key_attempts_threshold).then(|| Anomaly {
            kind: AnomalyKind::RevokedKeyUsage,
            severity: AnomalySeverity::High,
            actor,
            detail: format!("{attempts} attempts to use a non-active key in the window"),
        })
    }

    fn unusual_time(&self, actor: i64, ops: &[OperationRecord]) -> Option<Anomaly> {
        let start = self.config.working_hours_start;
        let end = self.config.working_hours_end;
        ops.iter()
            .find(|op| {
                let hour = op.timestamp.with_timezone(&chrono::Local).hour();
                hour < start || hour >= end
            })
            .map(|op| Anomaly {
                kind: AnomalyKind::UnusualTime,
                severity: AnomalySeverity::Low,
                actor,
                detail: format!(
                    "operation at {} local, outside working hours {:02}:00..{:02}:00",
                    op.timestamp.with_timezone(&chrono::Local).format("%H:%M"),
                    start,
                    end
                ),
            })
    }
}
