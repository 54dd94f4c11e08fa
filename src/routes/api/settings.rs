use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::put};
use serde::Deserialize;

use crate::{
    auth::{BearerToken, UserRole},
    response::{ApiResult, JsonApiResponse},
    routes::AuthRoleGuard,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/password", put(change_password))
        .with_state(state)
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthRoleGuard { principal, .. }: AuthRoleGuard<UserRole>,
    token: BearerToken,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .auth
        .change_password(
            principal.user_id,
            token.as_str(),
            &body.current_password,
            &body.new_password,
        )
        .await?;
    JsonApiResponse::with_status(StatusCode::OK, "Password changed", ())
}
