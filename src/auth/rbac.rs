use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account roles, ordered from least to most privileged.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Admin => 2,
            Role::SuperAdmin => 3,
        }
    }

    /// Rank of a role name as carried in a token. Unknown names rank 0.
    pub fn rank_of(role: &str) -> u8 {
        Role::from_str(role).map(Role::rank).unwrap_or(0)
    }
}

/// Returns true when `actual` ranks at or above `required`.
pub fn authorize(required: Role, actual: &str) -> bool {
    Role::rank_of(actual) >= required.rank()
}

/// Access rule attached to a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The caller's role must rank at or above this role.
    AtLeast(Role),
    /// The caller's role must be exactly this role.
    Exactly(Role),
}

impl Permission {
    pub fn permits(&self, actual: &str) -> bool {
        match self {
            Permission::AtLeast(required) => authorize(*required, actual),
            Permission::Exactly(required) => Role::from_str(actual) == Ok(*required),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::AtLeast(role) => write!(f, ">= {}", role),
            Permission::Exactly(role) => write!(f, "== {}", role),
        }
    }
}
