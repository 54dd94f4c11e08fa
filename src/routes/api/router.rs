use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{admin, auth, public, settings};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/auth", auth::router(state.clone()))
        .nest("/settings", settings::router(state.clone()))
        .nest("/admin", admin::router(state))
}
