use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    routing::delete,
};
use uuid::Uuid;

use crate::{
    auth::AdminRole,
    response::{ApiResult, JsonApiResponse},
    routes::AuthRoleGuard,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users/{id}/sessions", delete(revoke_sessions))
        .with_state(state)
}

async fn revoke_sessions(
    State(state): State<Arc<AppState>>,
    AuthRoleGuard { principal, .. }: AuthRoleGuard<AdminRole>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    let revoked = state.auth.revoke_user_sessions(user_id).await?;
    tracing::info!(admin_id = %principal.user_id, user_id = %user_id, revoked, "admin revoked sessions");
    JsonApiResponse::ok(serde_json::json!({ "revoked": revoked }))
}
