use std::sync::Arc;

use chrono::Utc;

use super::{
    AuthError, Principal, Role,
    stores::{CredentialStore, SessionStore},
    token,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Turns a bearer value into the caller's identity. Runs once per request.
#[derive(Clone)]
pub struct SessionResolver {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn CredentialStore>,
}

impl SessionResolver {
    pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn CredentialStore>) -> Self {
        Self { sessions, users }
    }

    /// Extracts the token from an `Authorization` header value.
    pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
        header
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Missing/invalid Authorization header"))
    }

    pub async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        if !token::is_well_formed(token) {
            return Err(invalid_session());
        }

        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or_else(invalid_session)?;

        if session.expires_at <= Utc::now().fixed_offset() {
            return Err(invalid_session());
        }

        let user = self
            .users
            .find_user(session.user_id)
            .await?
            .ok_or_else(invalid_session)?;

        Ok(Principal {
            user_id: user.id,
            role: Role::from_stored(&user.role),
            session_id: session.id,
        })
    }
}

fn invalid_session() -> AuthError {
    AuthError::unauthorized("Invalid or expired session")
}
