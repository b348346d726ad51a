//! Key registry — creates keys, enforces the lifecycle state machine,
//! and is the only component that touches wrapped material.
//!
//! Authorization happens before registry calls; the registry does not
//! re-check it.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use privguard_crypto::{
    ecc_generate_keypair, random_bytes, rsa_generate_keypair, MasterKey,
};
use privguard_storage::{KeyStore, NewKey};
use privguard_types::{KeyAlgorithm, KeyMaterial, KeyRecord, KeyStatus};
use std::sync::Arc;
use zeroize::Zeroizing;

pub struct KeyRegistry {
    keys: KeyStore,
    master: Arc<MasterKey>,
}

impl KeyRegistry {
    pub fn new(keys: KeyStore, master: Arc<MasterKey>) -> Self {
        Self { keys, master }
    }

    /// Generates fresh material for `algorithm`, wraps it under the
    /// master key, and persists the record.
    pub fn create_key(&self, owner: i64, name: &str, algorithm: KeyAlgorithm) -> CoreResult<KeyRecord> {
        let material = generate_material(algorithm)?;
        let payload = Zeroizing::new(
            material
                .to_canonical_json()
                .map_err(|e| CoreError::PersistenceFailure(format!("serialize key material: {e}")))?,
        );
        let (wrap_iv, wrapped) = self.master.wrap(&payload)?;

        let now = Utc::now();
        let public_id = new_public_id(now)?;
        let record = self.keys.insert(&NewKey {
            name,
            owner,
            public_id: &public_id,
            algorithm,
            wrapped_material: &wrapped,
            wrap_iv: &wrap_iv,
            status: KeyStatus::Active,
            created_at: now,
            expires_at: None,
        })?;
        Ok(record)
    }

    pub fn get_key(&self, internal_id: i64) -> CoreResult<Option<KeyRecord>> {
        Ok(self.keys.get(internal_id)?)
    }

    pub fn get_key_by_public_id(&self, public_id: &str) -> CoreResult<Option<KeyRecord>> {
        Ok(self.keys.get_by_public_id(public_id)?)
    }

    pub fn list_keys_for(&self, owner: i64) -> CoreResult<Vec<KeyRecord>> {
        Ok(self.keys.list_for_owner(owner)?)
    }

    pub fn list_all_keys(&self) -> CoreResult<Vec<KeyRecord>> {
        Ok(self.keys.list_all()?)
    }

    /// Unwraps the key's material for use. Fails with `KeyNotActive`
    /// for any non-active key; on success `last_used_at` advances.
    pub fn unwrap_material(&self, internal_id: i64) -> CoreResult<KeyMaterial> {
        let record = self.keys.get(internal_id)?.ok_or(CoreError::KeyUnknown)?;
        if !record.is_active() {
            return Err(CoreError::KeyNotActive);
        }

        let payload = self
            .master
            .unwrap(&record.wrap_iv, &record.wrapped_material)
            .map_err(|_| {
                CoreError::PersistenceFailure(
                    "stored key material cannot be unwrapped under the configured master key"
                        .to_string(),
                )
            })?;
        let material = KeyMaterial::from_canonical_json(&payload).map_err(|_| {
            CoreError::PersistenceFailure("stored key material is not a valid payload".to_string())
        })?;
        if !material.matches(record.algorithm) {
            return Err(CoreError::PersistenceFailure(
                "stored key material does not match the key algorithm".to_string(),
            ));
        }

        self.keys.touch_last_used(internal_id, Utc::now())?;
        Ok(material)
    }

    /// Revokes a key. Revoking an already non-active key is a no-op
    /// reported as success.
    pub fn revoke(&self, internal_id: i64) -> CoreResult<()> {
        let record = self.keys.get(internal_id)?.ok_or(CoreError::KeyUnknown)?;
        if !record.is_active() {
            return Ok(());
        }
        self.keys.set_status(internal_id, KeyStatus::Revoked, Utc::now())?;
        Ok(())
    }

    /// Marks a key expired. Reserved for scheduled lifecycle; core
    /// operations never call this.
    pub fn mark_expired(&self, internal_id: i64) -> CoreResult<()> {
        let record = self.keys.get(internal_id)?.ok_or(CoreError::KeyUnknown)?;
        if !record.is_active() {
            return Ok(());
        }
        self.keys.set_status(internal_id, KeyStatus::Expired, Utc::now())?;
        Ok(())
    }
}

fn generate_material(algorithm: KeyAlgorithm) -> CoreResult<KeyMaterial> {
    match algorithm {
        KeyAlgorithm::Aes128Cbc => Ok(KeyMaterial::Aes {
            key: random_bytes(16)?,
        }),
        KeyAlgorithm::Aes256Cbc | KeyAlgorithm::Aes256Gcm => Ok(KeyMaterial::Aes {
            key: random_bytes(32)?,
        }),
        KeyAlgorithm::Rsa2048 => {
            let pair = rsa_generate_keypair()?;
            Ok(KeyMaterial::Rsa {
                public_pem: pair.public_pem,
                private_pem: pair.private_pem,
            })
        }
        KeyAlgorithm::EccP256 => {
            let pair = ecc_generate_keypair()?;
            Ok(KeyMaterial::Ecc {
                public_pem: pair.public_pem,
                private_pem: pair.private_pem,
            })
        }
    }
}

/// Public ids are `K-<unix millis>-<8 hex>`: creation time plus four
/// random bytes.
fn new_public_id(now: DateTime<Utc>) -> CoreResult<String> {
    let suffix = random_bytes(4)?;
    Ok(format!("K-{}-{}", now.timestamp_millis(), hex::encode(suffix)))
}
