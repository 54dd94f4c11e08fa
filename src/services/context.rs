use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    auth::stores::AuthStores,
    db::dao::DaoContext,
    notify::NotificationSink,
    services::auth_service::{AuthPolicy, AuthService},
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
        }
    }

    /// Database-backed stores behind the auth seam.
    pub fn auth_stores(&self) -> AuthStores {
        AuthStores {
            users: Arc::new(self.daos.user()),
            sessions: Arc::new(self.daos.session()),
            verifications: Arc::new(self.daos.verification_token()),
            resets: Arc::new(self.daos.password_reset_token()),
        }
    }

    pub fn auth(&self, notifier: Arc<dyn NotificationSink>, policy: AuthPolicy) -> AuthService {
        AuthService::new(self.auth_stores(), notifier, policy)
    }
}
