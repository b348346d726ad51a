//! Backup codec — serializes a user's key set into one master-wrapped
//! artifact and restores it idempotently.
//!
//! Artifact wire form: `<16-byte-iv hex>:<aes-256-cbc ciphertext hex>`,
//! where the ciphertext is the JSON backup document wrapped under the
//! master key. Restore inserts only keys whose `public_id` is absent,
//! preserving algorithm, status, and wrapped material; ownership is
//! reassigned to the importer.

use crate::audit::AuditRecorder;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use privguard_crypto::MasterKey;
use privguard_storage::{KeyStore, NewKey};
use privguard_types::{AuditAction, AuditEntry, AuditStatus, KeyAlgorithm, KeyStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BACKUP_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize)]
struct BackupDocument {
    version: String,
    timestamp: DateTime<Utc>,
    keys: Vec<BackupKey>,
}

#[derive(Serialize, Deserialize)]
struct BackupKey {
    public_id: String,
    name: String,
    algorithm: KeyAlgorithm,
    status: KeyStatus,
    created_at: DateTime<Utc>,
    /// Hex; still wrapped under the master key, never plaintext.
    wrapped_material: String,
    wrap_iv: String,
}

pub struct BackupManager {
    keys: KeyStore,
    master: Arc<MasterKey>,
    recorder: AuditRecorder,
}

impl BackupManager {
    pub fn new(keys: KeyStore, master: Arc<MasterKey>, recorder: AuditRecorder) -> Self {
        Self {
            keys,
            master,
            recorder,
        }
    }

    /// Exports all of `owner`'s keys as one artifact string.
    pub fn export(&self, owner: i64) -> CoreResult<String> {
        match self.export_inner(owner) {
            Ok((artifact, count)) => {
                self.recorder.record(
                    AuditEntry::new(AuditAction::KeyBackup, AuditStatus::Success)
                        .with_actor(owner)
                        .with_detail("key_count", count),
                )?;
                Ok(artifact)
            }
            Err(e) => {
                self.recorder.record_best_effort(
                    AuditEntry::new(AuditAction::KeyBackup, AuditStatus::Failed)
                        .with_actor(owner)
                        .with_detail("error", e.kind())
                        .with_detail("message", e.to_string()),
                );
                Err(e)
            }
        }
    }

    fn export_inner(&self, owner: i64) -> CoreResult<(String, usize)> {
        let keys = self.keys.list_for_owner(owner)?;
        if keys.is_empty() {
            return Err(CoreError::NothingToBackUp);
        }

        let document = BackupDocument {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            keys: keys
                .iter()
                .map(|k| BackupKey {
                    public_id: k.public_id.clone(),
                    name: k.name.clone(),
                    algorithm: k.algorithm,
                    status: k.status,
                    created_at: k.created_at,
                    wrapped_material: hex::encode(&k.wrapped_material),
                    wrap_iv: hex::encode(k.wrap_iv),
                })
                .collect(),
        };
        let json = serde_json::to_vec(&document)
            .map_err(|e| CoreError::PersistenceFailure(format!("serialize backup: {e}")))?;
        let (iv, wrapped) = self.master.wrap(&json)?;
        Ok((
            format!("{}:{}", hex::encode(iv), hex::encode(wrapped)),
            keys.len(),
        ))
    }

    /// Restores an artifact into `owner`'s key set. Keys whose
    /// `public_id` already exists are left untouched, so restore is
    /// idempotent. Returns the number of keys inserted.
    pub fn import(&self, owner: i64, artifact: &str) -> CoreResult<usize> {
        match self.import_inner(owner, artifact) {
            Ok(restored) => {
                self.recorder.record(
                    AuditEntry::new(AuditAction::KeyRestore, AuditStatus::Success)
                        .with_actor(owner)
                        .with_detail("restored_count", restored),
                )?;
                Ok(restored)
            }
            Err(e) => {
                self.recorder.record_best_effort(
                    AuditEntry::new(AuditAction::KeyRestore, AuditStatus::Failed)
                        .with_actor(owner)
                        .with_detail("error", e.kind())
                        .with_detail("message", e.to_string()),
                );
                Err(e)
            }
        }
    }

    fn import_inner(&self, owner: i64, artifact: &str) -> CoreResult<usize> {
        let segments: Vec<&str> = artifact.split(':').collect();
        let [iv_hex, ciphertext_hex] = segments[..] else {
            return Err(CoreError::MalformedBackup(
                "expected <iv>:<ciphertext>".to_string(),
            ));
        };
        let iv = hex::decode(iv_hex)
            .map_err(|_| CoreError::MalformedBackup("artifact IV is not hex".to_string()))?;
        if iv.len() != 16 {
            return Err(CoreError::MalformedBackup(
                "artifact IV must be 16 bytes".to_string(),
            ));
        }
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| CoreError::MalformedBackup("artifact body is not hex".to_string()))?;

        let payload = self.master.unwrap(&iv, &ciphertext).map_err(|_| {
            CoreError::MalformedBackup(
                "artifact does not decrypt under the master key".to_string(),
            )
        })?;
        let document: BackupDocument = serde_json::from_slice(&payload)
            .map_err(|e| CoreError::MalformedBackup(format!("invalid backup document: {e}")))?;

        let mut restored = 0;
        for entry in &document.keys {
            if self.keys.get_by_public_id(&entry.public_id)?.is_some() {
                continue;
            }
            let wrapped_material = hex::decode(&entry.wrapped_material).map_err(|_| {
                CoreError::MalformedBackup("key material is not hex".to_string())
            })?;
            let wrap_iv: [u8; 16] = hex::decode(&entry.wrap_iv)
                .ok()
                .and_then(|iv| iv.try_into().ok())
                .ok_or_else(|| {
                    CoreError::MalformedBackup("key wrap IV must be 16 hex-encoded bytes".to_string())
                })?;

            self.keys.insert(&NewKey {
                name: &entry.name,
                owner,
                public_id: &entry.public_id,
                algorithm: entry.algorithm,
                wrapped_material: &wrapped_material,
                wrap_iv: &wrap_iv,
                status: entry.status,
                created_at: entry.created_at,
                expires_at: None,
            })?;
            restored += 1;
        }
        Ok(restored)
    }
}
