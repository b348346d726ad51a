//! Policy guard — authorization predicates evaluated before any
//! registry or engine work.
//!
//! Denials are deliberately opaque: every authorization failure is the
//! single `NotAuthorized` error regardless of cause, so the error
//! channel cannot be used to probe for key existence or role layout.

use crate::error::{CoreError, CoreResult};
use privguard_storage::UserStore;
use privguard_types::{Actor, KeyRecord};

/// Resolves callers and enforces role predicates.
#[derive(Clone)]
pub struct PolicyGuard {
    users: UserStore,
}

impl PolicyGuard {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    /// Resolves an actor id to an active actor. Unknown ids are
    /// `NotAuthenticated`; inactive accounts are denied.
    pub fn resolve_actor(&self, actor_id: i64) -> CoreResult<Actor> {
        let actor = self
            .users
            .get(actor_id)?
            .ok_or(CoreError::NotAuthenticated)?;
        if !actor.is_active() {
            return Err(CoreError::NotAuthorized);
        }
        Ok(actor)
    }

    /// Administrative surfaces (user listings, cross-actor queries)
    /// require the administrator role.
    pub fn require_administrator(&self, actor: &Actor) -> CoreResult<()> {
        if actor.is_administrator() {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized)
        }
    }
}

/// Non-administrators may only address keys they own; administrators
/// have universal read.
pub fn check_key_access(actor: &Actor, key: &KeyRecord) -> CoreResult<()> {
    if actor.is_administrator() || key.owner == actor.id {
        Ok(())
    } else {
        Err(CoreError::NotAuthorized)
    }
}

/// Mutation (revocation) is limited to the owner or an administrator.
pub fn check_key_mutation(actor: &Actor, key: &KeyRecord) -> CoreResult<()> {
    if actor.is_administrator() || key.owner == actor.id {
        Ok(())
    } else {
        Err(CoreError::NotAuthorized)
    }
}
