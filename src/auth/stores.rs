use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use super::Role;
use crate::db::dao::DaoResult;
use crate::db::entities::{password_reset_token, session, user, verification_token};

type Timestamp = DateTime<FixedOffset>;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub email_verified: bool,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>>;

    async fn find_user(&self, id: Uuid) -> DaoResult<Option<user::Model>>;

    async fn exists_by_email(&self, email: &str) -> DaoResult<bool> {
        self.find_by_email(email).await.map(|user| user.is_some())
    }

    /// Fails with `DaoLayerError::UniqueViolation` when the email is taken.
    async fn create_user(&self, user: NewUser) -> DaoResult<user::Model>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DaoResult<()>;

    async fn mark_email_verified(&self, id: Uuid) -> DaoResult<()>;

    async fn set_last_login(&self, id: Uuid, at: Timestamp) -> DaoResult<()>;
}

/// Every method is a single statement, so each call is atomic on its own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<session::Model>;

    /// Expired rows are treated as absent.
    async fn find_by_token(&self, token: &str) -> DaoResult<Option<session::Model>>;

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64>;

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64>;

    async fn delete_all_for_user_except(&self, user_id: Uuid, keep_token: &str)
    -> DaoResult<u64>;

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64>;
}

#[async_trait]
pub trait VerificationTokenStore: Send + Sync {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<verification_token::Model>;

    /// Returns the row regardless of expiry or consumption.
    async fn find_by_token(&self, token: &str) -> DaoResult<Option<verification_token::Model>>;

    /// Flips `consumed` only if it is still false. `false` means another caller won.
    async fn mark_consumed(&self, id: Uuid) -> DaoResult<bool>;

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64>;
}

#[async_trait]
pub trait PasswordResetTokenStore: Send + Sync {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<password_reset_token::Model>;

    /// Returns the row regardless of expiry.
    async fn find_by_token(&self, token: &str)
    -> DaoResult<Option<password_reset_token::Model>>;

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64>;

    async fn delete_unused_for_user(&self, user_id: Uuid) -> DaoResult<u64>;

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64>;

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64>;
}

#[derive(Clone)]
pub struct AuthStores {
    pub users: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub verifications: Arc<dyn VerificationTokenStore>,
    pub resets: Arc<dyn PasswordResetTokenStore>,
}
