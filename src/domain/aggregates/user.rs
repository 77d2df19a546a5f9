//! Buyer identity and addresses.
//!
//! Authentication lives outside this crate; checkout only needs a resolved
//! actor and the ability to materialize a user row for guest buyers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::ParseEnumError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    User,
    Vendor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Vendor => "VENDOR",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

impl FromStr for UserRole {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(UserRole::User),
            "VENDOR" => Ok(UserRole::Vendor),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(ParseEnumError { kind: "user role", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Suspended => "SUSPENDED",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "SUSPENDED" => Ok(UserStatus::Suspended),
            other => Err(ParseEnumError { kind: "user status", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    /// Opaque credential. Guest rows get a random placeholder that is not
    /// expected to authenticate.
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Materializes a real user row for a guest checkout.
    pub fn materialize_guest(email: impl Into<String>, full_name: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: full_name.into(),
            phone,
            role: UserRole::User,
            status: UserStatus::Active,
            credential: format!("guest:{:032x}", rand::random::<u128>()),
            created_at: Utc::now(),
        }
    }
}

/// A saved address. Orders copy the fields they need instead of referencing
/// this row, so edits here never alter order history. At most one address
/// per user holds `is_default`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Caller identity resolved once at the boundary and passed explicitly into
/// the checkout path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Actor {
    Authenticated { id: Uuid, email: String, role: UserRole },
    Guest,
}

impl Actor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::Authenticated { id, .. } => Some(*id),
            Actor::Guest => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::Authenticated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_materialization_defaults() {
        let u = User::materialize_guest("a@b.com", "A Buyer", None);
        assert_eq!(u.role, UserRole::User);
        assert_eq!(u.status, UserStatus::Active);
        assert!(u.credential.starts_with("guest:"));
    }

    #[test]
    fn test_guest_credentials_are_opaque_and_distinct() {
        let a = User::materialize_guest("a@b.com", "A", None);
        let b = User::materialize_guest("a@b.com", "A", None);
        assert_ne!(a.credential, b.credential);
    }

    #[test]
    fn test_actor_user_id() {
        let id = Uuid::new_v4();
        let actor = Actor::Authenticated { id, email: "a@b.com".into(), role: UserRole::User };
        assert_eq!(actor.user_id(), Some(id));
        assert_eq!(Actor::Guest.user_id(), None);
    }
}
