//! User entity and its lifecycle rules.
//!
//! # Invariants
//! - `id` is immutable and never reused.
//! - Email is unique across active and inactive users (enforced by the
//!   handler against the store; the entity only normalizes it).
//! - The role is never changed by an update unless the caller was granted
//!   `can_change_role` (a Regular user cannot self-promote).
//! - Deactivation is one-way; there is no reactivation path.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::UserId;

/// Closed role enumeration consumed by the access policy predicates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Default role, scoped to one's own created records.
    #[default]
    Regular,
    /// Elevated role with cross-user visibility and workflow rights.
    Agent,
}

impl Role {
    pub fn is_agent(&self) -> bool {
        matches!(self, Role::Agent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "regular",
            Role::Agent => "agent",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Role::Regular),
            "agent" => Ok(Role::Agent),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A user account. Never hard-deleted; deactivation flips `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    /// Opaque credential; hashing/verification lives behind the auth crate's
    /// `PasswordHasher`. Plaintext never reaches this type.
    pub password_hash: String,
}

/// Caller-supplied profile changes. `role` is applied only when the policy
/// grant allows it.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl User {
    /// Register a new account. The id is fresh, the account starts active,
    /// and the credential arrives already hashed.
    pub fn register(
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        password_hash: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        let email = normalize_email(email.into())?;

        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            name,
            email,
            role,
            active: true,
            password_hash: password_hash.into(),
        })
    }

    /// Apply a profile update.
    ///
    /// The role field only moves when `can_change_role` is set; a submitted
    /// role change without the grant is ignored, not rejected. A new
    /// credential hash replaces the old one; `None` leaves it untouched.
    pub fn apply_update(
        &mut self,
        patch: UserPatch,
        can_change_role: bool,
        new_password_hash: Option<String>,
    ) -> DomainResult<()> {
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = normalize_email(email)?;
        }
        if let Some(role) = patch.role {
            if can_change_role {
                self.role = role;
            }
        }
        if let Some(hash) = new_password_hash {
            self.password_hash = hash;
        }
        Ok(())
    }

    /// Deactivate the account. One-way; repeated deactivation is a conflict.
    pub fn deactivate(&mut self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::conflict("account already inactive"));
        }
        self.active = false;
        Ok(())
    }
}

fn normalize_email(email: String) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}
