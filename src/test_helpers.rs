//! In-memory stores and a recording notification sink for tests. The database is
//! replaced at the store-trait seam, so the auth flow runs unchanged on top.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{DbErr, RuntimeErr};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    auth::{
        Role,
        stores::{
            AuthStores, CredentialStore, NewUser, PasswordResetTokenStore, SessionStore,
            VerificationTokenStore,
        },
    },
    config::AppConfig,
    db::{
        dao::{DaoLayerError, DaoResult},
        entities::{password_reset_token, session, user, verification_token},
    },
    notify::{Notification, NotificationSink},
    routes::app,
    services::{AuthPolicy, AuthService},
    state::AppState,
};

type Timestamp = DateTime<FixedOffset>;

fn now() -> Timestamp {
    Utc::now().fixed_offset()
}

#[derive(Default)]
struct MemoryState {
    users: Vec<user::Model>,
    sessions: Vec<session::Model>,
    verifications: Vec<verification_token::Model>,
    resets: Vec<password_reset_token::Model>,
}

#[derive(Clone, Default)]
pub struct MemoryAuthStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stores(&self) -> AuthStores {
        AuthStores {
            users: self.users(),
            sessions: self.sessions(),
            verifications: Arc::new(self.clone()),
            resets: Arc::new(self.clone()),
        }
    }

    pub fn users(&self) -> Arc<dyn CredentialStore> {
        Arc::new(self.clone())
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        Arc::new(self.clone())
    }

    pub fn insert_user(&self, email: &str, password_hash: &str, role: Role) -> user::Model {
        let ts = now();
        let model = user::Model {
            id: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: "Test User".to_string(),
            role: role.as_str().to_string(),
            email_verified: false,
            last_login_at: None,
        };
        self.lock().users.push(model.clone());
        model
    }

    pub fn users_snapshot(&self) -> Vec<user::Model> {
        self.lock().users.clone()
    }

    pub fn remove_user(&self, id: Uuid) {
        self.lock().users.retain(|user| user.id != id);
    }

    pub fn user(&self, id: Uuid) -> Option<user::Model> {
        self.lock().users.iter().find(|user| user.id == id).cloned()
    }

    /// Raw rows, expired ones included.
    pub fn sessions_for(&self, user_id: Uuid) -> Vec<session::Model> {
        self.lock()
            .sessions
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn verification_tokens_for(&self, user_id: Uuid) -> Vec<verification_token::Model> {
        self.lock()
            .verifications
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn reset_tokens_for(&self, user_id: Uuid) -> Vec<password_reset_token::Model> {
        self.lock()
            .resets
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn reset_token_count(&self) -> usize {
        self.lock().resets.len()
    }

    pub fn put_session(&self, user_id: Uuid, token: &str, expires_at: Timestamp) {
        let ts = now();
        self.lock().sessions.push(session::Model {
            id: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
            token: token.to_string(),
            user_id,
            expires_at,
        });
    }

    pub fn put_verification_token(&self, user_id: Uuid, token: &str, expires_at: Timestamp) {
        let ts = now();
        self.lock().verifications.push(verification_token::Model {
            id: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
            token: token.to_string(),
            user_id,
            expires_at,
            consumed: false,
        });
    }

    pub fn put_reset_token(&self, user_id: Uuid, token: &str, expires_at: Timestamp) {
        let ts = now();
        self.lock().resets.push(password_reset_token::Model {
            id: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
            token: token.to_string(),
            user_id,
            expires_at,
            consumed: false,
        });
    }

    pub fn expire_verification_token(&self, token: &str) {
        let past = now() - chrono::Duration::seconds(1);
        for row in self.lock().verifications.iter_mut() {
            if row.token == token {
                row.expires_at = past;
            }
        }
    }

    pub fn expire_reset_token(&self, token: &str) {
        let past = now() - chrono::Duration::seconds(1);
        for row in self.lock().resets.iter_mut() {
            if row.token == token {
                row.expires_at = past;
            }
        }
    }

    fn update_user(&self, id: Uuid, apply: impl FnOnce(&mut user::Model)) -> DaoResult<()> {
        let mut state = self.lock();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(DaoLayerError::NotFound {
                entity: "users",
                id,
            })?;
        apply(user);
        user.updated_at = now();
        Ok(())
    }
}

fn affected(before: usize, after: usize) -> u64 {
    (before - after) as u64
}

#[async_trait]
impl CredentialStore for MemoryAuthStore {
    async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
        Ok(self.lock().users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> DaoResult<Option<user::Model>> {
        Ok(self.user(id))
    }

    async fn create_user(&self, new_user: NewUser) -> DaoResult<user::Model> {
        let mut state = self.lock();
        if state.users.iter().any(|user| user.email == new_user.email) {
            return Err(DaoLayerError::UniqueViolation("users.email".to_string()));
        }

        let ts = now();
        let model = user::Model {
            id: Uuid::new_v4(),
            created_at: ts,
            updated_at: ts,
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            role: new_user.role.as_str().to_string(),
            email_verified: new_user.email_verified,
            last_login_at: None,
        };
        state.users.push(model.clone());
        Ok(model)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DaoResult<()> {
        self.update_user(id, |user| user.password_hash = password_hash.to_string())
    }

    async fn mark_email_verified(&self, id: Uuid) -> DaoResult<()> {
        self.update_user(id, |user| user.email_verified = true)
    }

    async fn set_last_login(&self, id: Uuid, at: Timestamp) -> DaoResult<()> {
        self.update_user(id, |user| user.last_login_at = Some(at))
    }
}

#[async_trait]
impl SessionStore for MemoryAuthStore {
    async fn create_session(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<session::Model> {
        self.put_session(user_id, token, expires_at);
        self.lock()
            .sessions
            .iter()
            .rev()
            .find(|row| row.token == token)
            .cloned()
            .ok_or_else(|| DaoLayerError::Db(DbErr::Custom("session insert lost".to_string())))
    }

    async fn find_by_token(&self, token: &str) -> DaoResult<Option<session::Model>> {
        let ts = now();
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|row| row.token == token && row.expires_at > ts)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|row| row.token != token);
        Ok(affected(before, state.sessions.len()))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|row| row.user_id != user_id);
        Ok(affected(before, state.sessions.len()))
    }

    async fn delete_all_for_user_except(
        &self,
        user_id: Uuid,
        keep_token: &str,
    ) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state
            .sessions
            .retain(|row| row.user_id != user_id || row.token == keep_token);
        Ok(affected(before, state.sessions.len()))
    }

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|row| row.expires_at > now);
        Ok(affected(before, state.sessions.len()))
    }
}

#[async_trait]
impl VerificationTokenStore for MemoryAuthStore {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<verification_token::Model> {
        self.put_verification_token(user_id, token, expires_at);
        self.lock()
            .verifications
            .iter()
            .rev()
            .find(|row| row.token == token)
            .cloned()
            .ok_or_else(|| DaoLayerError::Db(DbErr::Custom("token insert lost".to_string())))
    }

    async fn find_by_token(&self, token: &str) -> DaoResult<Option<verification_token::Model>> {
        Ok(self
            .lock()
            .verifications
            .iter()
            .find(|row| row.token == token)
            .cloned())
    }

    async fn mark_consumed(&self, id: Uuid) -> DaoResult<bool> {
        let mut state = self.lock();
        match state
            .verifications
            .iter_mut()
            .find(|row| row.id == id && !row.consumed)
        {
            Some(row) => {
                row.consumed = true;
                row.updated_at = now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.verifications.len();
        state.verifications.retain(|row| row.expires_at > now);
        Ok(affected(before, state.verifications.len()))
    }
}

#[async_trait]
impl PasswordResetTokenStore for MemoryAuthStore {
    async fn create_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: Timestamp,
    ) -> DaoResult<password_reset_token::Model> {
        self.put_reset_token(user_id, token, expires_at);
        self.lock()
            .resets
            .iter()
            .rev()
            .find(|row| row.token == token)
            .cloned()
            .ok_or_else(|| DaoLayerError::Db(DbErr::Custom("token insert lost".to_string())))
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> DaoResult<Option<password_reset_token::Model>> {
        Ok(self.lock().resets.iter().find(|row| row.token == token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.resets.len();
        state.resets.retain(|row| row.token != token);
        Ok(affected(before, state.resets.len()))
    }

    async fn delete_unused_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.resets.len();
        state
            .resets
            .retain(|row| row.user_id != user_id || row.consumed);
        Ok(affected(before, state.resets.len()))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.resets.len();
        state.resets.retain(|row| row.user_id != user_id);
        Ok(affected(before, state.resets.len()))
    }

    async fn delete_expired(&self, now: Timestamp) -> DaoResult<u64> {
        let mut state = self.lock();
        let before = state.resets.len();
        state.resets.retain(|row| row.expires_at > now);
        Ok(affected(before, state.resets.len()))
    }
}

/// Session store whose every call fails, for exercising the 500 path.
#[derive(Clone, Default)]
pub struct FailingSessionStore;

fn store_down() -> DaoLayerError {
    DaoLayerError::Db(DbErr::Conn(RuntimeErr::Internal(
        "connection refused".to_string(),
    )))
}

#[async_trait]
impl SessionStore for FailingSessionStore {
    async fn create_session(&self, _: Uuid, _: &str, _: Timestamp) -> DaoResult<session::Model> {
        Err(store_down())
    }

    async fn find_by_token(&self, _: &str) -> DaoResult<Option<session::Model>> {
        Err(store_down())
    }

    async fn delete_by_token(&self, _: &str) -> DaoResult<u64> {
        Err(store_down())
    }

    async fn delete_all_for_user(&self, _: Uuid) -> DaoResult<u64> {
        Err(store_down())
    }

    async fn delete_all_for_user_except(&self, _: Uuid, _: &str) -> DaoResult<u64> {
        Err(store_down())
    }

    async fn delete_expired(&self, _: Timestamp) -> DaoResult<u64> {
        Err(store_down())
    }
}

/// Forwards every notification into a channel the test can read from.
#[derive(Clone)]
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl RecordingSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.tx
            .send(notification.clone())
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}

pub async fn next_notification(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification should arrive in time")
        .expect("notification channel should stay open")
}

pub struct TestAuth {
    pub auth: AuthService,
    pub store: MemoryAuthStore,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

impl TestAuth {
    pub fn new() -> Self {
        Self::with_policy(AuthPolicy::default())
    }

    pub fn with_policy(policy: AuthPolicy) -> Self {
        Self::with_store(MemoryAuthStore::new(), policy)
    }

    pub fn with_store(store: MemoryAuthStore, policy: AuthPolicy) -> Self {
        Self::with_stores(store.clone(), store.stores(), policy)
    }

    pub fn with_stores(store: MemoryAuthStore, stores: AuthStores, policy: AuthPolicy) -> Self {
        let (sink, notifications) = RecordingSink::channel();
        let auth = AuthService::new(stores, Arc::new(sink), policy);
        Self {
            auth,
            store,
            notifications,
        }
    }
}

impl Default for TestAuth {
    fn default() -> Self {
        Self::new()
    }
}

/// Full HTTP stack over in-memory stores.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: MemoryAuthStore,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let harness = TestAuth::with_policy(AuthPolicy::from(&config.auth));
        Self::from_harness(config, harness)
    }

    pub fn from_harness(config: AppConfig, harness: TestAuth) -> Self {
        let state = AppState::new(config, harness.auth);
        Self {
            router: app(Arc::clone(&state)),
            state,
            store: harness.store,
            notifications: harness.notifications,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
