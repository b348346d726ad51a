//! Shared domain types for the PrivGuard cryptographic core.
//!
//! Everything the core crates exchange lives here: actors and roles, key
//! records with their lifecycle status, the algorithm sum type, unwrapped
//! key material, and the two record streams (operations and audit) that
//! the anomaly detector reads.

mod actor;
mod audit;
mod key;
mod material;
mod operation;

pub use actor::{Actor, ActorStatus, Role};
pub use audit::{AuditAction, AuditEntry, AuditRecord, AuditStatus};
pub use key::{KeyAlgorithm, KeyInfo, KeyRecord, KeyStatus, ParseEnumError};
pub use material::KeyMaterial;
pub use operation::{OperationKind, OperationOutcome, OperationRecord};
