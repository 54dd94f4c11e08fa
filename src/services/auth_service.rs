use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        AuthError, IssuedSession, PublicUser, Role, SessionResolver,
        password::{
            hash_password_blocking, validate_password, verify_dummy, verify_password_blocking,
        },
        stores::{AuthStores, NewUser},
        token::{self, generate_token},
    },
    config::AuthConfig,
    db::dao::DaoLayerError,
    notify::{Notification, NotificationKind, NotificationSink},
};

/// Lifetimes and gates applied by [`AuthService`].
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
    pub reset_ttl: Duration,
    pub require_verified_email: bool,
    /// `None` keeps expired verification and reset rows; only sessions are swept.
    pub token_retention: Option<Duration>,
}

impl From<&AuthConfig> for AuthPolicy {
    fn from(cfg: &AuthConfig) -> Self {
        let hours = |value: i64| Duration::try_hours(value).unwrap_or(Duration::MAX);
        Self {
            session_ttl: hours(cfg.session_ttl_hours),
            verification_ttl: hours(cfg.verification_ttl_hours),
            reset_ttl: Duration::try_minutes(cfg.reset_ttl_minutes).unwrap_or(Duration::MAX),
            require_verified_email: cfg.require_verified_email,
            token_retention: (cfg.token_retention_hours > 0)
                .then(|| hours(cfg.token_retention_hours)),
        }
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: u64,
    pub verification_tokens: u64,
    pub reset_tokens: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.sessions + self.verification_tokens + self.reset_tokens
    }
}

type Timestamp = DateTime<FixedOffset>;

fn shifted(at: Timestamp, by: Duration) -> Result<Timestamp, AuthError> {
    at.checked_add_signed(by).ok_or_else(|| {
        AuthError::internal(format!("timestamp {at} shifted by {by} is out of range"))
    })
}

/// Emails are compared case-insensitively; every store access goes through this.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct AuthService {
    stores: AuthStores,
    notifier: Arc<dyn NotificationSink>,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        stores: AuthStores,
        notifier: Arc<dyn NotificationSink>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            stores,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> SessionResolver {
        SessionResolver::new(self.stores.sessions.clone(), self.stores.users.clone())
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Uuid, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::validation("Valid email required"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::validation("Name required"));
        }
        validate_password(password)?;

        if self.stores.users.exists_by_email(&email).await? {
            return Err(AuthError::conflict("User already exists"));
        }

        let password_hash = hash_password_blocking(password).await?;
        let user = self
            .stores
            .users
            .create_user(NewUser {
                email,
                password_hash,
                name: name.to_string(),
                role: Role::User,
                email_verified: false,
            })
            .await
            .map_err(conflict_on_duplicate)?;

        let token = generate_token();
        let expires_at = shifted(Utc::now().fixed_offset(), self.policy.verification_ttl)?;
        self.stores
            .verifications
            .create_token(user.id, &token, expires_at)
            .await?;

        self.dispatch(Notification {
            recipient: user.email.clone(),
            kind: NotificationKind::EmailVerification,
            token,
        });

        info!(user_id = %user.id, "user registered");
        Ok(user.id)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.stores.users.find_by_email(&email).await? else {
            verify_dummy(password).await;
            return Err(AuthError::Authentication);
        };

        if !verify_password_blocking(password, &user.password_hash).await? {
            return Err(AuthError::Authentication);
        }

        if self.policy.require_verified_email && !user.email_verified {
            return Err(AuthError::forbidden("Email not verified"));
        }

        let token = generate_token();
        let now = Utc::now().fixed_offset();
        let expires_at = shifted(now, self.policy.session_ttl)?;
        self.stores
            .sessions
            .create_session(user.id, &token, expires_at)
            .await?;
        // The session row is already live; the client must still receive its token.
        if let Err(err) = self.stores.users.set_last_login(user.id, now).await {
            warn!(user_id = %user.id, error = %err, "failed to record last login");
        }

        info!(user_id = %user.id, "user logged in");
        Ok(IssuedSession {
            token,
            expires_at,
            user: PublicUser::from(&user),
        })
    }

    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        if !token::is_well_formed(token) {
            return Err(AuthError::not_found("Verification token not found"));
        }

        let record = self
            .stores
            .verifications
            .find_by_token(token)
            .await?
            .ok_or_else(|| AuthError::not_found("Verification token not found"))?;

        if record.consumed {
            return Err(AuthError::already_used("Verification token already used"));
        }
        if record.expires_at <= Utc::now().fixed_offset() {
            return Err(AuthError::expired("Verification token expired"));
        }

        if !self.stores.verifications.mark_consumed(record.id).await? {
            return Err(AuthError::already_used("Verification token already used"));
        }
        self.stores
            .users
            .mark_email_verified(record.user_id)
            .await
            .map_err(user_not_found)?;

        info!(user_id = %record.user_id, "email verified");
        Ok(())
    }

    /// Never reveals whether the email is registered.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if let Err(err) = self.issue_reset_token(&email).await {
            warn!(error = %err, "password reset request could not be processed");
        }
        Ok(())
    }

    async fn issue_reset_token(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.stores.users.find_by_email(email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let replaced = self.stores.resets.delete_unused_for_user(user.id).await?;
        let token = generate_token();
        let expires_at = shifted(Utc::now().fixed_offset(), self.policy.reset_ttl)?;
        self.stores
            .resets
            .create_token(user.id, &token, expires_at)
            .await?;

        self.dispatch(Notification {
            recipient: user.email.clone(),
            kind: NotificationKind::PasswordReset,
            token,
        });

        info!(user_id = %user.id, replaced, "password reset token issued");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        if !token::is_well_formed(token) {
            return Err(AuthError::not_found("Reset token not found"));
        }

        let record = self
            .stores
            .resets
            .find_by_token(token)
            .await?
            .ok_or_else(|| AuthError::not_found("Reset token not found"))?;

        if record.expires_at <= Utc::now().fixed_offset() {
            return Err(AuthError::expired("Reset token expired"));
        }

        let password_hash = hash_password_blocking(new_password).await?;

        // Claiming by delete makes concurrent resets with one token mutually exclusive.
        if self.stores.resets.delete_by_token(token).await? == 0 {
            return Err(AuthError::not_found("Reset token not found"));
        }

        self.stores
            .users
            .set_password_hash(record.user_id, &password_hash)
            .await
            .map_err(user_not_found)?;
        self.stores.resets.delete_all_for_user(record.user_id).await?;
        let revoked = self.stores.sessions.delete_all_for_user(record.user_id).await?;

        info!(user_id = %record.user_id, revoked, "password reset");
        Ok(())
    }

    /// Deleting an already-missing session is not an error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if !token::is_well_formed(token) {
            return Ok(());
        }
        let deleted = self.stores.sessions.delete_by_token(token).await?;
        debug!(deleted, "session logout");
        Ok(())
    }

    /// Keeps the session identified by `current_token`; every other session of the
    /// user is revoked.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .stores
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AuthError::not_found("User not found"))?;

        if !verify_password_blocking(current_password, &user.password_hash).await? {
            return Err(AuthError::validation("Current password is incorrect"));
        }
        validate_password(new_password)?;

        let password_hash = hash_password_blocking(new_password).await?;
        self.stores
            .users
            .set_password_hash(user.id, &password_hash)
            .await
            .map_err(user_not_found)?;
        let revoked = self
            .stores
            .sessions
            .delete_all_for_user_except(user.id, current_token)
            .await?;

        info!(user_id = %user.id, revoked, "password changed");
        Ok(())
    }

    pub async fn revoke_user_sessions(&self, user_id: Uuid) -> Result<u64, AuthError> {
        if self.stores.users.find_user(user_id).await?.is_none() {
            return Err(AuthError::not_found("User not found"));
        }

        let revoked = self.stores.sessions.delete_all_for_user(user_id).await?;
        info!(user_id = %user_id, revoked, "sessions revoked");
        Ok(revoked)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AuthError> {
        self.stores
            .users
            .find_user(user_id)
            .await?
            .map(|user| PublicUser::from(&user))
            .ok_or_else(|| AuthError::not_found("User not found"))
    }

    /// Returns `true` when the account was created by this call.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let email = normalize_email(email);
        if self.stores.users.exists_by_email(&email).await? {
            return Ok(false);
        }

        let password_hash = hash_password_blocking(password).await?;
        let created = self
            .stores
            .users
            .create_user(NewUser {
                email,
                password_hash,
                name: "Administrator".to_string(),
                role: Role::Admin,
                email_verified: true,
            })
            .await;

        match created {
            Ok(_) => Ok(true),
            Err(DaoLayerError::UniqueViolation(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes expired sessions. Verification and reset rows go only once they are
    /// older than the retention window; until then lookups still report them as
    /// expired or already used.
    pub async fn sweep_expired(&self) -> Result<SweepReport, AuthError> {
        let now = Utc::now().fixed_offset();
        let sessions = self.stores.sessions.delete_expired(now).await?;
        let Some(retention) = self.policy.token_retention else {
            return Ok(SweepReport {
                sessions,
                ..SweepReport::default()
            });
        };

        let cutoff = shifted(now, -retention)?;
        Ok(SweepReport {
            sessions,
            verification_tokens: self.stores.verifications.delete_expired(cutoff).await?,
            reset_tokens: self.stores.resets.delete_expired(cutoff).await?,
        })
    }

    fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = notifier.send(&notification).await {
                warn!(
                    kind = notification.kind.as_str(),
                    error = %err,
                    "notification delivery failed"
                );
            }
        });
    }
}

fn conflict_on_duplicate(err: DaoLayerError) -> AuthError {
    match err {
        DaoLayerError::UniqueViolation(_) => AuthError::conflict("User already exists"),
        other => other.into(),
    }
}

fn user_not_found(err: DaoLayerError) -> AuthError {
    match err {
        DaoLayerError::NotFound { .. } => AuthError::not_found("User not found"),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, FixedOffset, Utc};
    use sea_orm::DbErr;
    use uuid::Uuid;

    use super::{AuthPolicy, normalize_email};
    use crate::{
        auth::{
            AuthError, Role,
            stores::{AuthStores, CredentialStore, NewUser},
            token::generate_token,
        },
        db::{
            dao::{DaoLayerError, DaoResult},
            entities::user,
        },
        notify::NotificationKind,
        test_helpers::{MemoryAuthStore, TestAuth, next_notification},
    };

    const PASSWORD: &str = "password123";

    #[test]
    fn policy_follows_config_defaults() {
        let policy = AuthPolicy::default();

        assert_eq!(policy.session_ttl, Duration::hours(24));
        assert_eq!(policy.verification_ttl, Duration::hours(24));
        assert_eq!(policy.reset_ttl, Duration::minutes(60));
        assert!(!policy.require_verified_email);
        assert!(policy.token_retention.is_none());
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[tokio::test]
    async fn register_creates_unverified_user_and_sends_verification() {
        let mut harness = TestAuth::new();

        let user_id = harness
            .auth
            .register("Alice@Example.com", PASSWORD, "Alice")
            .await
            .expect("register should succeed");

        let user = harness.store.user(user_id).expect("user should exist");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, "USER");
        assert!(!user.email_verified);
        assert_ne!(user.password_hash, PASSWORD);

        let notification = next_notification(&mut harness.notifications).await;
        assert_eq!(notification.kind, NotificationKind::EmailVerification);
        assert_eq!(notification.recipient, "alice@example.com");
        let tokens = harness.store.verification_tokens_for(user_id);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, notification.token);
        assert!(tokens[0].expires_at > Utc::now().fixed_offset() + Duration::hours(23));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let harness = TestAuth::new();

        for (email, password, name) in [
            ("", PASSWORD, "Alice"),
            ("not-an-email", PASSWORD, "Alice"),
            ("alice@example.com", PASSWORD, "  "),
            ("alice@example.com", "short", "Alice"),
        ] {
            let err = harness
                .auth
                .register(email, password, name)
                .await
                .expect_err("register should fail");
            assert!(matches!(err, AuthError::Validation(_)), "{email:?} {name:?}");
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_case_insensitively() {
        let harness = TestAuth::new();
        harness
            .auth
            .register("bob@example.com", PASSWORD, "Bob")
            .await
            .expect("first register should succeed");

        let err = harness
            .auth
            .register("BOB@example.com", PASSWORD, "Bob")
            .await
            .expect_err("second register should fail");

        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let harness = TestAuth::new();
        harness
            .auth
            .register("carol@example.com", PASSWORD, "Carol")
            .await
            .expect("register should succeed");

        let unknown = harness
            .auth
            .login("nobody@example.com", PASSWORD)
            .await
            .expect_err("unknown email should fail");
        let wrong = harness
            .auth
            .login("carol@example.com", "wrong-password")
            .await
            .expect_err("wrong password should fail");

        assert!(matches!(unknown, AuthError::Authentication));
        assert!(matches!(wrong, AuthError::Authentication));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn login_issues_independent_sessions() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("dave@example.com", PASSWORD, "Dave")
            .await
            .expect("register should succeed");

        let first = harness
            .auth
            .login("Dave@example.com", PASSWORD)
            .await
            .expect("login should succeed");
        let second = harness
            .auth
            .login("dave@example.com", PASSWORD)
            .await
            .expect("login should succeed");

        assert_ne!(first.token, second.token);
        assert_eq!(first.user.id, user_id);
        assert_eq!(first.user.role, Role::User);
        assert_eq!(harness.store.sessions_for(user_id).len(), 2);
        assert!(harness.store.user(user_id).and_then(|u| u.last_login_at).is_some());

        let resolver = harness.auth.resolver();
        let principal = resolver.resolve(&first.token).await.expect("first resolves");
        assert_eq!(principal.user_id, user_id);
        resolver.resolve(&second.token).await.expect("second resolves");
    }

    #[tokio::test]
    async fn login_can_require_verified_email() {
        let harness = TestAuth::with_policy(AuthPolicy {
            require_verified_email: true,
            ..AuthPolicy::default()
        });
        harness
            .auth
            .register("erin@example.com", PASSWORD, "Erin")
            .await
            .expect("register should succeed");

        let err = harness
            .auth
            .login("erin@example.com", PASSWORD)
            .await
            .expect_err("unverified login should fail");
        assert!(matches!(err, AuthError::Forbidden(ref msg) if msg == "Email not verified"));

        let wrong = harness
            .auth
            .login("erin@example.com", "wrong-password")
            .await
            .expect_err("wrong password should fail");
        assert!(matches!(wrong, AuthError::Authentication));
    }

    #[tokio::test]
    async fn verify_email_is_single_use() {
        let mut harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("frank@example.com", PASSWORD, "Frank")
            .await
            .expect("register should succeed");
        let token = next_notification(&mut harness.notifications).await.token;

        harness
            .auth
            .verify_email(&token)
            .await
            .expect("first verify should succeed");
        assert!(harness.store.user(user_id).is_some_and(|u| u.email_verified));

        let err = harness
            .auth
            .verify_email(&token)
            .await
            .expect_err("second verify should fail");
        assert!(matches!(err, AuthError::AlreadyUsed(_)));
    }

    #[tokio::test]
    async fn verify_email_reports_unknown_and_expired_tokens() {
        let mut harness = TestAuth::new();
        harness
            .auth
            .register("gina@example.com", PASSWORD, "Gina")
            .await
            .expect("register should succeed");
        let token = next_notification(&mut harness.notifications).await.token;
        harness.store.expire_verification_token(&token);

        let expired = harness
            .auth
            .verify_email(&token)
            .await
            .expect_err("expired token should fail");
        let unknown = harness
            .auth
            .verify_email(&generate_token())
            .await
            .expect_err("unknown token should fail");
        let garbage = harness
            .auth
            .verify_email("garbage")
            .await
            .expect_err("garbage token should fail");

        assert!(matches!(expired, AuthError::Expired(_)));
        assert!(matches!(unknown, AuthError::NotFound(_)));
        assert!(matches!(garbage, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_does_nothing() {
        let mut harness = TestAuth::new();

        harness
            .auth
            .forgot_password("nobody@example.com")
            .await
            .expect("forgot password always succeeds");

        assert_eq!(harness.store.reset_token_count(), 0);
        assert!(harness.notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn forgot_password_keeps_one_active_token() {
        let mut harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("hank@example.com", PASSWORD, "Hank")
            .await
            .expect("register should succeed");
        next_notification(&mut harness.notifications).await;

        harness
            .auth
            .forgot_password("hank@example.com")
            .await
            .expect("first request");
        let first = next_notification(&mut harness.notifications).await;
        harness
            .auth
            .forgot_password(" HANK@example.com")
            .await
            .expect("second request");
        let second = next_notification(&mut harness.notifications).await;

        assert_eq!(second.kind, NotificationKind::PasswordReset);
        let tokens = harness.store.reset_tokens_for(user_id);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, second.token);
        assert_ne!(first.token, second.token);

        let err = harness
            .auth
            .reset_password(&first.token, "new-password-1")
            .await
            .expect_err("replaced token should fail");
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_password_revokes_every_session_and_token() {
        let mut harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("ivy@example.com", PASSWORD, "Ivy")
            .await
            .expect("register should succeed");
        next_notification(&mut harness.notifications).await;
        let session = harness
            .auth
            .login("ivy@example.com", PASSWORD)
            .await
            .expect("login should succeed");
        harness
            .auth
            .forgot_password("ivy@example.com")
            .await
            .expect("forgot password");
        let token = next_notification(&mut harness.notifications).await.token;

        harness
            .auth
            .reset_password(&token, "new-password-1")
            .await
            .expect("reset should succeed");

        assert!(harness.store.sessions_for(user_id).is_empty());
        assert!(harness.store.reset_tokens_for(user_id).is_empty());
        let resolver = harness.auth.resolver();
        assert!(resolver.resolve(&session.token).await.is_err());

        let old = harness
            .auth
            .login("ivy@example.com", PASSWORD)
            .await
            .expect_err("old password should fail");
        assert!(matches!(old, AuthError::Authentication));
        harness
            .auth
            .login("ivy@example.com", "new-password-1")
            .await
            .expect("new password should work");

        let reused = harness
            .auth
            .reset_password(&token, "new-password-2")
            .await
            .expect_err("token is single use");
        assert!(matches!(reused, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_password_rejects_expired_token_and_short_password() {
        let mut harness = TestAuth::new();
        harness
            .auth
            .register("jack@example.com", PASSWORD, "Jack")
            .await
            .expect("register should succeed");
        next_notification(&mut harness.notifications).await;
        harness
            .auth
            .forgot_password("jack@example.com")
            .await
            .expect("forgot password");
        let token = next_notification(&mut harness.notifications).await.token;

        let short = harness
            .auth
            .reset_password(&token, "short")
            .await
            .expect_err("short password should fail");
        assert!(matches!(short, AuthError::Validation(_)));

        harness.store.expire_reset_token(&token);
        let expired = harness
            .auth
            .reset_password(&token, "new-password-1")
            .await
            .expect_err("expired token should fail");
        assert!(matches!(expired, AuthError::Expired(_)));
    }

    #[tokio::test]
    async fn change_password_keeps_only_the_current_session() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("kate@example.com", PASSWORD, "Kate")
            .await
            .expect("register should succeed");
        let current = harness
            .auth
            .login("kate@example.com", PASSWORD)
            .await
            .expect("login T1");
        let other = harness
            .auth
            .login("kate@example.com", PASSWORD)
            .await
            .expect("login T2");

        harness
            .auth
            .change_password(user_id, &current.token, PASSWORD, "new-password-1")
            .await
            .expect("change should succeed");

        let resolver = harness.auth.resolver();
        resolver
            .resolve(&current.token)
            .await
            .expect("current session stays valid");
        let err = resolver
            .resolve(&other.token)
            .await
            .expect_err("other session is revoked");
        assert!(matches!(err, AuthError::Unauthorized(_)));
        harness
            .auth
            .login("kate@example.com", "new-password-1")
            .await
            .expect("new password should work");
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("liam@example.com", PASSWORD, "Liam")
            .await
            .expect("register should succeed");
        let session = harness
            .auth
            .login("liam@example.com", PASSWORD)
            .await
            .expect("login should succeed");

        let err = harness
            .auth
            .change_password(user_id, &session.token, "wrong-password", "new-password-1")
            .await
            .expect_err("change should fail");

        assert!(
            matches!(err, AuthError::Validation(ref msg) if msg == "Current password is incorrect")
        );
        harness
            .auth
            .login("liam@example.com", PASSWORD)
            .await
            .expect("old password still works");
    }

    #[tokio::test]
    async fn change_password_enforces_minimum_length() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("mona@example.com", PASSWORD, "Mona")
            .await
            .expect("register should succeed");
        let session = harness
            .auth
            .login("mona@example.com", PASSWORD)
            .await
            .expect("login should succeed");

        let err = harness
            .auth
            .change_password(user_id, &session.token, PASSWORD, "short")
            .await
            .expect_err("short password should be rejected");

        assert!(matches!(err, AuthError::Validation(ref msg) if msg == "Password too short"));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("mia@example.com", PASSWORD, "Mia")
            .await
            .expect("register should succeed");
        let session = harness
            .auth
            .login("mia@example.com", PASSWORD)
            .await
            .expect("login should succeed");

        harness.auth.logout(&session.token).await.expect("logout");
        harness.auth.logout(&session.token).await.expect("second logout");
        harness.auth.logout("garbage").await.expect("garbage logout");

        assert!(harness.store.sessions_for(user_id).is_empty());
    }

    #[tokio::test]
    async fn revoke_user_sessions_counts_and_checks_user() {
        let harness = TestAuth::new();
        let user_id = harness
            .auth
            .register("nina@example.com", PASSWORD, "Nina")
            .await
            .expect("register should succeed");
        for _ in 0..2 {
            harness
                .auth
                .login("nina@example.com", PASSWORD)
                .await
                .expect("login should succeed");
        }

        let revoked = harness
            .auth
            .revoke_user_sessions(user_id)
            .await
            .expect("revoke should succeed");
        assert_eq!(revoked, 2);

        let err = harness
            .auth
            .revoke_user_sessions(Uuid::new_v4())
            .await
            .expect_err("unknown user should fail");
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn ensure_admin_creates_verified_admin_once() {
        let harness = TestAuth::new();

        let created = harness
            .auth
            .ensure_admin("Admin@Example.com", "adminpassword")
            .await
            .expect("seed should succeed");
        let again = harness
            .auth
            .ensure_admin("admin@example.com", "adminpassword")
            .await
            .expect("second seed should succeed");

        assert!(created);
        assert!(!again);
        let session = harness
            .auth
            .login("admin@example.com", "adminpassword")
            .await
            .expect("admin login should succeed");
        assert_eq!(session.user.role, Role::Admin);
        assert!(session.user.email_verified);
    }

    #[tokio::test]
    async fn sweep_keeps_token_outcomes_without_retention() {
        let store = MemoryAuthStore::new();
        let harness = TestAuth::with_store(store.clone(), AuthPolicy::default());
        let user = store.insert_user("olga@example.com", "hash", Role::User);
        let now = Utc::now().fixed_offset();
        store.put_session(user.id, &generate_token(), now - Duration::minutes(1));
        store.put_session(user.id, &generate_token(), now + Duration::hours(1));

        let used = generate_token();
        store.put_verification_token(user.id, &used, now + Duration::hours(1));
        harness.auth.verify_email(&used).await.expect("first verify");
        store.expire_verification_token(&used);
        let pending = generate_token();
        store.put_verification_token(user.id, &pending, now - Duration::days(2));
        let reset = generate_token();
        store.put_reset_token(user.id, &reset, now - Duration::days(2));

        let report = harness.auth.sweep_expired().await.expect("sweep should run");

        assert_eq!(report.sessions, 1);
        assert_eq!(report.verification_tokens, 0);
        assert_eq!(report.reset_tokens, 0);
        assert_eq!(store.sessions_for(user.id).len(), 1);

        let err = harness.auth.verify_email(&used).await.expect_err("used token");
        assert!(matches!(err, AuthError::AlreadyUsed(_)));
        let err = harness.auth.verify_email(&pending).await.expect_err("expired token");
        assert!(matches!(err, AuthError::Expired(_)));
        let err = harness
            .auth
            .reset_password(&reset, "new-password-1")
            .await
            .expect_err("expired reset token");
        assert!(matches!(err, AuthError::Expired(_)));
    }

    #[tokio::test]
    async fn sweep_deletes_tokens_past_retention_only() {
        let store = MemoryAuthStore::new();
        let harness = TestAuth::with_store(
            store.clone(),
            AuthPolicy {
                token_retention: Some(Duration::hours(24)),
                ..AuthPolicy::default()
            },
        );
        let user = store.insert_user("pete@example.com", "hash", Role::User);
        let now = Utc::now().fixed_offset();
        store.put_verification_token(user.id, &generate_token(), now - Duration::days(2));
        store.put_reset_token(user.id, &generate_token(), now - Duration::days(2));
        let recent = generate_token();
        store.put_verification_token(user.id, &recent, now - Duration::minutes(1));
        store.put_reset_token(user.id, &generate_token(), now - Duration::minutes(1));

        let report = harness.auth.sweep_expired().await.expect("sweep should run");

        assert_eq!(report.verification_tokens, 1);
        assert_eq!(report.reset_tokens, 1);
        assert_eq!(report.total(), 2);
        assert_eq!(store.reset_token_count(), 1);
        let err = harness.auth.verify_email(&recent).await.expect_err("expired token");
        assert!(matches!(err, AuthError::Expired(_)));
    }

    #[tokio::test]
    async fn out_of_range_lifetime_fails_without_panicking() {
        let harness = TestAuth::with_policy(AuthPolicy {
            session_ttl: Duration::MAX,
            ..AuthPolicy::default()
        });
        harness
            .auth
            .register("quinn@example.com", PASSWORD, "Quinn")
            .await
            .expect("register should succeed");

        let err = harness
            .auth
            .login("quinn@example.com", PASSWORD)
            .await
            .expect_err("login should fail");

        assert!(matches!(err, AuthError::Internal(_)));
        assert!(harness.store.users_snapshot()[0].last_login_at.is_none());
    }

    #[test]
    fn huge_configured_lifetimes_saturate() {
        let cfg = crate::config::AuthConfig {
            session_ttl_hours: i64::MAX,
            token_retention_hours: 48,
            ..crate::config::AuthConfig::default()
        };

        let policy = AuthPolicy::from(&cfg);

        assert_eq!(policy.session_ttl, Duration::MAX);
        assert_eq!(policy.token_retention, Some(Duration::hours(48)));
    }

    struct LastLoginWriteFails(MemoryAuthStore);

    #[async_trait]
    impl CredentialStore for LastLoginWriteFails {
        async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
            self.0.find_by_email(email).await
        }

        async fn find_user(&self, id: Uuid) -> DaoResult<Option<user::Model>> {
            self.0.find_user(id).await
        }

        async fn create_user(&self, new_user: NewUser) -> DaoResult<user::Model> {
            self.0.create_user(new_user).await
        }

        async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DaoResult<()> {
            self.0.set_password_hash(id, password_hash).await
        }

        async fn mark_email_verified(&self, id: Uuid) -> DaoResult<()> {
            self.0.mark_email_verified(id).await
        }

        async fn set_last_login(&self, _: Uuid, _: DateTime<FixedOffset>) -> DaoResult<()> {
            Err(DaoLayerError::Db(DbErr::Custom("write failed".to_string())))
        }
    }

    #[tokio::test]
    async fn login_survives_a_failed_last_login_write() {
        let store = MemoryAuthStore::new();
        let stores = AuthStores {
            users: Arc::new(LastLoginWriteFails(store.clone())),
            ..store.stores()
        };
        let harness = TestAuth::with_stores(store.clone(), stores, AuthPolicy::default());
        let user_id = harness
            .auth
            .register("rosa@example.com", PASSWORD, "Rosa")
            .await
            .expect("register should succeed");

        let session = harness
            .auth
            .login("rosa@example.com", PASSWORD)
            .await
            .expect("login should still succeed");

        let principal = harness
            .auth
            .resolver()
            .resolve(&session.token)
            .await
            .expect("issued session resolves");
        assert_eq!(principal.user_id, user_id);
        assert!(store.user(user_id).expect("user").last_login_at.is_none());
    }
}
