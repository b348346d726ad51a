//! The transport-facing facade.
//!
//! `PrivacyCore` owns all components and wires every public operation
//! through the same path: policy guard first, then registry/engine,
//! then the record streams. It is the only type a transport layer needs.

use crate::anomaly::AnomalyDetector;
use crate::audit::AuditRecorder;
use crate::backup::BackupManager;
use crate::config::CoreConfig;
use crate::engine::CryptoEngine;
use crate::error::{CoreError, CoreResult};
use crate::policy::{self, PolicyGuard};
use crate::registry::KeyRegistry;
use privguard_crypto::MasterKey;
use privguard_storage::{AuditFilter, Database, OperationStore, UserStore};
use privguard_types::{
    Actor, AuditAction, AuditEntry, AuditRecord, AuditStatus, KeyInfo, OperationRecord,
};
use std::path::Path;
use std::sync::Arc;

/// Upper bound on rows returned by [`PrivacyCore::security_alerts`].
const ALERTS_LIMIT: usize = 500;

pub struct PrivacyCore {
    guard: PolicyGuard,
    registry: Arc<KeyRegistry>,
    engine: CryptoEngine,
    backup: BackupManager,
    recorder: AuditRecorder,
    detector: Arc<AnomalyDetector>,
    operations: OperationStore,
    db: Database,
}

impl PrivacyCore {
    /// Opens (or creates) the core's database under `dir` and builds
    /// the component graph.
    pub fn open(dir: &Path, config: CoreConfig) -> CoreResult<Self> {
        let db = Database::open(&dir.join("privguard.db"))?;
        Self::build(db, config)
    }

    /// Fully in-memory core (for testing).
    pub fn open_in_memory(config: CoreConfig) -> CoreResult<Self> {
        let db = Database::open_in_memory()?;
        Self::build(db, config)
    }

    fn build(db: Database, config: CoreConfig) -> CoreResult<Self> {
        let master = Arc::new(MasterKey::from_config(config.master_key_hex.as_deref())?);
        let recorder = AuditRecorder::new(db.audit());
        let registry = Arc::new(KeyRegistry::new(db.keys(), master.clone()));
        let detector = Arc::new(AnomalyDetector::new(
            config.anomaly.clone(),
            db.operations(),
            db.audit(),
            recorder.clone(),
        ));
        let guard = PolicyGuard::new(db.users());
        let engine = CryptoEngine::new(
            registry.clone(),
            guard.clone(),
            db.operations(),
            recorder.clone(),
            detector.clone(),
        );
        let backup = BackupManager::new(db.keys(), master, recorder.clone());
        let operations = db.operations();

        Ok(Self {
            guard,
            registry,
            engine,
            backup,
            recorder,
            detector,
            operations,
            db,
        })
    }

    /// User management is an external concern; the transport layer gets
    /// direct store access for it.
    pub fn users(&self) -> UserStore {
        self.db.users()
    }

    /// Creates a key for the caller. The algorithm arrives as a string
    /// from the transport and is parsed into the closed sum here — no
    /// string comparisons survive past this boundary.
    pub async fn create_key(
        &self,
        actor_id: i64,
        name: &str,
        algorithm: &str,
    ) -> CoreResult<KeyInfo> {
        match self.create_key_inner(actor_id, name, algorithm) {
            Ok(info) => {
                self.recorder.record(
                    AuditEntry::new(AuditAction::KeyGenerate, AuditStatus::Success)
                        .with_actor(actor_id)
                        .with_resource(info.public_id.clone())
                        .with_detail("algorithm", info.algorithm.to_string()),
                )?;
                Ok(info)
            }
            Err(e) => {
                self.record_failed(actor_id, AuditAction::KeyGenerate, None, &e);
                Err(e)
            }
        }
    }

    fn create_key_inner(&self, actor_id: i64, name: &str, algorithm: &str) -> CoreResult<KeyInfo> {
        let actor = self.guard.resolve_actor(actor_id)?;
        let algorithm = algorithm
            .parse()
            .map_err(|_| CoreError::BadAlgorithm(algorithm.to_string()))?;
        let record = self.registry.create_key(actor.id, name, algorithm)?;
        Ok(record.redacted())
    }

    /// Revokes a key. Propagates instantly: every later use of the key
    /// fails at the registry's status check.
    pub async fn revoke_key(&self, actor_id: i64, key_internal_id: i64) -> CoreResult<()> {
        match self.revoke_key_inner(actor_id, key_internal_id) {
            Ok(public_id) => {
                self.recorder.record(
                    AuditEntry::new(AuditAction::KeyRevoke, AuditStatus::Success)
                        .with_actor(actor_id)
                        .with_resource(public_id),
                )?;
                Ok(())
            }
            Err(e) => {
                self.record_failed(actor_id, AuditAction::KeyRevoke, None, &e);
                Err(e)
            }
        }
    }

    fn revoke_key_inner(&self, actor_id: i64, key_internal_id: i64) -> CoreResult<String> {
        let actor = self.guard.resolve_actor(actor_id)?;
        let key = self
            .registry
            .get_key(key_internal_id)?
            .ok_or(CoreError::KeyUnknown)?;
        policy::check_key_mutation(&actor, &key)?;
        self.registry.revoke(key.internal_id)?;
        Ok(key.public_id)
    }

    /// Lists keys, redacted. Administrators see every key; everyone
    /// else sees their own.
    pub async fn list_keys(&self, actor_id: i64) -> CoreResult<Vec<KeyInfo>> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::KeyList)?;
        let records = if actor.is_administrator() {
            self.registry.list_all_keys()?
        } else {
            self.registry.list_keys_for(actor.id)?
        };
        Ok(records.iter().map(|k| k.redacted()).collect())
    }

    pub async fn encrypt(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        data: &[u8],
        resource_label: &str,
    ) -> CoreResult<String> {
        self.engine
            .encrypt(actor_id, key_internal_id, data, resource_label)
            .await
    }

    pub async fn decrypt(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        envelope: &str,
        resource_label: &str,
    ) -> CoreResult<Vec<u8>> {
        self.engine
            .decrypt(actor_id, key_internal_id, envelope, resource_label)
            .await
    }

    pub async fn export_backup(&self, actor_id: i64) -> CoreResult<String> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::KeyBackup)?;
        self.backup.export(actor.id)
    }

    pub async fn import_backup(&self, actor_id: i64, artifact: &str) -> CoreResult<usize> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::KeyRestore)?;
        self.backup.import(actor.id, artifact)
    }

    /// The caller's own recent operations, newest first.
    pub async fn list_operations(
        &self,
        actor_id: i64,
        limit: usize,
    ) -> CoreResult<Vec<OperationRecord>> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::OperationList)?;
        Ok(self.operations.list_for_actor(actor.id, limit)?)
    }

    /// Filtered audit query with total count. Administrator only.
    pub async fn query_audit(
        &self,
        actor_id: i64,
        filter: &AuditFilter,
        limit: usize,
        offset: usize,
    ) -> CoreResult<(Vec<AuditRecord>, i64)> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::AuditQuery)?;
        if let Err(e) = self.guard.require_administrator(&actor) {
            self.record_failed(actor_id, AuditAction::AuditQuery, None, &e);
            return Err(e);
        }
        self.recorder.query(filter, limit, offset)
    }

    /// Anomaly warnings for the caller, or — for administrators — for
    /// any actor (`filter_actor = None` means all actors).
    pub async fn security_alerts(
        &self,
        actor_id: i64,
        filter_actor: Option<i64>,
    ) -> CoreResult<Vec<AuditRecord>> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::AlertsView)?;
        let effective = if actor.is_administrator() {
            filter_actor
        } else {
            match filter_actor {
                Some(a) if a != actor.id => {
                    let e = CoreError::NotAuthorized;
                    self.record_failed(actor_id, AuditAction::AlertsView, None, &e);
                    return Err(e);
                }
                _ => Some(actor.id),
            }
        };
        let filter = AuditFilter {
            actor: effective,
            action: Some(AuditAction::AnomalyDetected),
            status: None,
        };
        let (records, _) = self.recorder.query(&filter, ALERTS_LIMIT, 0)?;
        Ok(records)
    }

    /// Drops the caller's anomaly cache and records the reset.
    pub async fn clear_alerts(&self, actor_id: i64) -> CoreResult<()> {
        let actor = self.resolve_or_audit(actor_id, AuditAction::AlertsCleared)?;
        self.detector.reset(actor.id).await;
        self.recorder.record(
            AuditEntry::new(AuditAction::AlertsCleared, AuditStatus::Success)
                .with_actor(actor.id),
        )?;
        Ok(())
    }

    /// Resolves the caller, writing a FAILED audit row naming the
    /// denied action when the guard refuses — every denial leaves a
    /// trace, read surfaces included.
    fn resolve_or_audit(&self, actor_id: i64, action: AuditAction) -> CoreResult<Actor> {
        self.guard.resolve_actor(actor_id).map_err(|e| {
            self.record_failed(actor_id, action, None, &e);
            e
        })
    }

    fn record_failed(
        &self,
        actor_id: i64,
        action: AuditAction,
        resource: Option<&str>,
        err: &CoreError,
    ) {
        let mut entry = AuditEntry::new(action, AuditStatus::Failed)
            .with_actor(actor_id)
            .with_detail("error", err.kind())
            .with_detail("message", err.to_string());
        if let Some(resource) = resource {
            entry = entry.with_resource(resource);
        }
        self.recorder.record_best_effort(entry);
    }
}
