use std::sync::Arc;

use crate::{auth::SessionResolver, config::AppConfig, services::AuthService};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthService,
    pub resolver: SessionResolver,
}

impl AppState {
    pub fn new(config: AppConfig, auth: AuthService) -> Arc<Self> {
        let resolver = auth.resolver();
        Arc::new(Self {
            config,
            auth,
            resolver,
        })
    }
}

