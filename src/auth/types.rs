use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::db::entities::user;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Unknown stored roles degrade to `USER`.
    pub fn from_stored(value: &str) -> Self {
        Role::try_from(value).unwrap_or(Role::User)
    }

    /// `ADMIN` satisfies every requirement, `USER` only its own.
    pub fn satisfies(&self, required: &Role) -> bool {
        matches!((self, required), (Role::Admin, _) | (Role::User, Role::User))
    }
}

impl TryFrom<&str> for Role {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

pub trait RequiredRole {
    fn required() -> Role;
}

pub struct UserRole;

impl RequiredRole for UserRole {
    fn required() -> Role {
        Role::User
    }
}

pub struct AdminRole;

impl RequiredRole for AdminRole {
    fn required() -> Role {
        Role::Admin
    }
}

/// Identity resolved from a live session. Handlers take identity from here only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub session_id: Uuid,
}

impl Principal {
    pub fn has_role(&self, required: &Role) -> bool {
        self.role.satisfies(required)
    }

    /// Ownership check for user-scoped resources such as summaries and quizzes.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AuthError> {
        if self.user_id == owner_id || self.role == Role::Admin {
            return Ok(());
        }
        Err(AuthError::forbidden("Resource belongs to another user"))
    }
}

/// Raw bearer value of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&user::Model> for PublicUser {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: Role::from_stored(&user.role),
            email_verified: user.email_verified,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
    pub user: PublicUser,
}
