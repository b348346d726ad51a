//! Crypto engine — resolves and authorizes the key, dispatches on the
//! algorithm sum, and maintains the two record streams.
//!
//! Successful calls write one operation row and one SUCCESS audit row.
//! Failed calls write no operation row (the operations stream is
//! success-only) but always one FAILED audit row, observable before the
//! error returns. Anomaly analysis is kicked off on a background task
//! either way and never blocks the result.

use crate::anomaly::AnomalyDetector;
use crate::audit::AuditRecorder;
use crate::envelope::CiphertextEnvelope;
use crate::error::{CoreError, CoreResult};
use crate::policy::{self, PolicyGuard};
use crate::registry::KeyRegistry;
use chrono::Utc;
use privguard_crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, aes_gcm_decrypt, aes_gcm_encrypt, ecdh_agree_with_point,
    ecdh_ephemeral_agree, random_bytes, rsa_decrypt, rsa_encrypt, sha256, CryptoError,
    RSA_MAX_PLAINTEXT,
};
use privguard_storage::{NewOperation, OperationStore};
use privguard_types::{
    AuditAction, AuditEntry, AuditStatus, KeyMaterial, KeyRecord, OperationKind, OperationOutcome,
    OperationRecord,
};
use std::sync::Arc;

pub struct CryptoEngine {
    registry: Arc<KeyRegistry>,
    guard: PolicyGuard,
    operations: OperationStore,
    recorder: AuditRecorder,
    detector: Arc<AnomalyDetector>,
}

impl CryptoEngine {
    pub fn new(
        registry: Arc<KeyRegistry>,
        guard: PolicyGuard,
        operations: OperationStore,
        recorder: AuditRecorder,
        detector: Arc<AnomalyDetector>,
    ) -> Self {
        Self {
            registry,
            guard,
            operations,
            recorder,
            detector,
        }
    }

    /// Encrypts `plaintext` under the addressed key and returns the
    /// self-describing envelope.
    pub async fn encrypt(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        plaintext: &[u8],
        resource_label: &str,
    ) -> CoreResult<String> {
        match self.encrypt_inner(actor_id, key_internal_id, plaintext) {
            Ok((key, envelope)) => {
                match self.settle_success(actor_id, OperationKind::Encrypt, &key, resource_label) {
                    Ok(()) => Ok(envelope),
                    Err(e) => {
                        self.settle_failure(actor_id, AuditAction::DataEncrypt, resource_label, &e);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                self.settle_failure(actor_id, AuditAction::DataEncrypt, resource_label, &e);
                Err(e)
            }
        }
    }

    /// Decrypts an envelope produced by [`encrypt`](Self::encrypt).
    pub async fn decrypt(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        envelope: &str,
        resource_label: &str,
    ) -> CoreResult<Vec<u8>> {
        match self.decrypt_inner(actor_id, key_internal_id, envelope) {
            Ok((key, plaintext)) => {
                match self.settle_success(actor_id, OperationKind::Decrypt, &key, resource_label) {
                    Ok(()) => Ok(plaintext),
                    Err(e) => {
                        self.settle_failure(actor_id, AuditAction::DataDecrypt, resource_label, &e);
                        Err(e)
                    }
                }
            }
            Err(e) => {
                self.settle_failure(actor_id, AuditAction::DataDecrypt, resource_label, &e);
                Err(e)
            }
        }
    }

    fn encrypt_inner(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        plaintext: &[u8],
    ) -> CoreResult<(KeyRecord, String)> {
        let (key, material) = self.load_key(actor_id, key_internal_id)?;
        let envelope = self.dispatch_encrypt(&key, &material, plaintext)?;
        Ok((key, envelope.encode()))
    }

    fn dispatch_encrypt(
        &self,
        key: &KeyRecord,
        material: &KeyMaterial,
        plaintext: &[u8],
    ) -> CoreResult<CiphertextEnvelope> {
        use privguard_types::KeyAlgorithm::*;
        match (key.algorithm, material) {
            (Aes128Cbc | Aes256Cbc, KeyMaterial::Aes { key: aes_key }) => {
                let iv = fresh::<16>()?;
                let ciphertext = aes_cbc_encrypt(aes_key, &iv, plaintext)?;
                Ok(CiphertextEnvelope::AesCbc { iv, ciphertext })
            }
            (Aes256Gcm, KeyMaterial::Aes { key: aes_key }) => {
                let nonce = fresh::<12>()?;
                let ciphertext = aes_gcm_encrypt(aes_key, &nonce, plaintext)?;
                Ok(CiphertextEnvelope::AesGcm { nonce, ciphertext })
            }
            (Rsa2048, KeyMaterial::Rsa { public_pem, .. }) => {
                if plaintext.len() > RSA_MAX_PLAINTEXT {
                    return Err(CoreError::InputTooLarge {
                        got: plaintext.len(),
                        limit: RSA_MAX_PLAINTEXT,
                    });
                }
                Ok(CiphertextEnvelope::Rsa {
                    ciphertext: rsa_encrypt(public_pem, plaintext)?,
                })
            }
            (EccP256, KeyMaterial::Ecc { public_pem, .. }) => {
                let agreement = ecdh_ephemeral_agree(public_pem)?;
                let aes_key = sha256(&agreement.shared_secret);
                let iv = fresh::<16>()?;
                let ciphertext = aes_cbc_encrypt(&aes_key, &iv, plaintext)?;
                Ok(CiphertextEnvelope::EccHybrid {
                    ephemeral_public: agreement.public_sec1,
                    iv,
                    ciphertext,
                })
            }
            _ => Err(material_mismatch()),
        }
    }

    fn decrypt_inner(
        &self,
        actor_id: i64,
        key_internal_id: i64,
        envelope: &str,
    ) -> CoreResult<(KeyRecord, Vec<u8>)> {
        let (key, material) = self.load_key(actor_id, key_internal_id)?;
        let parsed = CiphertextEnvelope::decode(key.algorithm, envelope)?;

        let plaintext = match (&parsed, &material) {
            (CiphertextEnvelope::AesCbc { iv, ciphertext }, KeyMaterial::Aes { key: aes_key }) => {
                aes_cbc_decrypt(aes_key, iv, ciphertext)?
            }
            (CiphertextEnvelope::AesGcm { nonce, ciphertext }, KeyMaterial::Aes { key: aes_key }) => {
                aes_gcm_decrypt(aes_key, nonce, ciphertext)?
            }
            (CiphertextEnvelope::Rsa { ciphertext }, KeyMaterial::Rsa { private_pem, .. }) => {
                rsa_decrypt(private_pem, ciphertext)?
            }
            (
                CiphertextEnvelope::EccHybrid {
                    ephemeral_public,
                    iv,
                    ciphertext,
                },
                KeyMaterial::Ecc { private_pem, .. },
            ) => {
                let shared = ecdh_agree_with_point(private_pem, ephemeral_public).map_err(
                    |e| match e {
                        // An off-curve ephemeral point is a bad envelope,
                        // not bad stored material.
                        CryptoError::BadKey(_) => CoreError::MalformedEnvelope,
                        other => other.into(),
                    },
                )?;
                let aes_key = sha256(&shared);
                aes_cbc_decrypt(&aes_key, iv, ciphertext)?
            }
            _ => return Err(material_mismatch()),
        };
        Ok((key, plaintext))
    }

    /// Resolve actor, key, and material, applying the guard in order:
    /// caller, then ownership, then key status (inside the registry).
    fn load_key(&self, actor_id: i64, key_internal_id: i64) -> CoreResult<(KeyRecord, KeyMaterial)> {
        let actor = self.guard.resolve_actor(actor_id)?;
        let key = self
            .registry
            .get_key(key_internal_id)?
            .ok_or(CoreError::KeyUnknown)?;
        policy::check_key_access(&actor, &key)?;
        let material = self.registry.unwrap_material(key.internal_id)?;
        Ok((key, material))
    }

    /// Success bookkeeping: one operation row, one SUCCESS audit row,
    /// then background analysis fed with the new operation.
    fn settle_success(
        &self,
        actor_id: i64,
        kind: OperationKind,
        key: &KeyRecord,
        resource_label: &str,
    ) -> CoreResult<()> {
        let action = match kind {
            OperationKind::Encrypt => AuditAction::DataEncrypt,
            OperationKind::Decrypt => AuditAction::DataDecrypt,
        };
        let op = self.operations.insert(&NewOperation {
            actor: actor_id,
            key_internal_id: Some(key.internal_id),
            kind,
            algorithm: key.algorithm,
            resource_label: Some(resource_label),
            outcome: OperationOutcome::Success,
            timestamp: Utc::now(),
        })?;
        self.recorder.record(
            AuditEntry::new(action, AuditStatus::Success)
                .with_actor(actor_id)
                .with_resource(resource_label)
                .with_detail("key", key.public_id.clone())
                .with_detail("algorithm", key.algorithm.to_string()),
        )?;
        self.spawn_analysis(actor_id, Some(op));
        Ok(())
    }

    /// Failure bookkeeping: one FAILED audit row with the sanitized
    /// error kind, written before the error propagates, then background
    /// analysis.
    fn settle_failure(
        &self,
        actor_id: i64,
        action: AuditAction,
        resource_label: &str,
        err: &CoreError,
    ) {
        self.recorder.record_best_effort(
            AuditEntry::new(action, AuditStatus::Failed)
                .with_actor(actor_id)
                .with_resource(resource_label)
                .with_detail("error", err.kind())
                .with_detail("message", err.to_string()),
        );
        self.spawn_analysis(actor_id, None);
    }

    fn spawn_analysis(&self, actor: i64, op: Option<OperationRecord>) {
        let detector = self.detector.clone();
        tokio::spawn(async move {
            if let Some(op) = op {
                detector.observe(op).await;
            }
            detector.scan(actor).await;
        });
    }
}

fn material_mismatch() -> CoreError {
    CoreError::PersistenceFailure(
        "stored key material does not match the key algorithm".to_string(),
    )
}

fn fresh<const N: usize>() -> CoreResult<[u8; N]> {
    let bytes = random_bytes(N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}
