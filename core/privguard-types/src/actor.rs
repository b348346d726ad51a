//! Actors and roles. The core only reads these; user management is an
//! external concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an actor in the access control hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Manager,
    Standard,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::Manager => write!(f, "manager"),
            Role::Standard => write!(f, "standard"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Role::Administrator),
            "manager" => Ok(Role::Manager),
            "standard" => Ok(Role::Standard),
            other => Err(super::ParseEnumError::new("role", other)),
        }
    }
}

/// Whether an actor may currently use the system at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorStatus {
    Active,
    Inactive,
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorStatus::Active => write!(f, "active"),
            ActorStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for ActorStatus {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ActorStatus::Active),
            "inactive" => Ok(ActorStatus::Inactive),
            other => Err(super::ParseEnumError::new("actor status", other)),
        }
    }
}

/// A caller of core operations, resolved from the user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub status: ActorStatus,
}

impl Actor {
    pub fn is_active(&self) -> bool {
        self.status == ActorStatus::Active
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}
