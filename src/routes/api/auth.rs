use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{BearerToken, IssuedSession, PublicUser},
    response::{ApiResult, JsonApiResponse},
    routes::AuthGuard,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
    pub user: PublicUser,
}

impl From<IssuedSession> for LoginResponse {
    fn from(session: IssuedSession) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at,
            user: session.user,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let user_id = state
        .auth
        .register(&body.email, &body.password, &body.name)
        .await?;
    JsonApiResponse::with_status(
        StatusCode::CREATED,
        "Registration successful. Please verify your email.",
        RegisterResponse { user_id },
    )
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let session = state.auth.login(&body.email, &body.password).await?;
    JsonApiResponse::ok(session.into())
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<()> {
    state.auth.verify_email(&query.token).await?;
    JsonApiResponse::with_status(StatusCode::OK, "Email verified", ())
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    state.auth.forgot_password(&body.email).await?;
    JsonApiResponse::with_status(
        StatusCode::OK,
        "If the email is registered, a reset link has been sent.",
        (),
    )
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    state
        .auth
        .reset_password(&body.token, &body.new_password)
        .await?;
    JsonApiResponse::with_status(StatusCode::OK, "Password has been reset", ())
}

// Needs only a bearer value; an already-revoked session still logs out cleanly.
async fn logout(State(state): State<Arc<AppState>>, token: BearerToken) -> ApiResult<()> {
    state.auth.logout(token.as_str()).await?;
    JsonApiResponse::with_status(StatusCode::OK, "Logged out", ())
}

async fn me(State(state): State<Arc<AppState>>, principal: AuthGuard) -> ApiResult<PublicUser> {
    let user = state.auth.current_user(principal.user_id).await?;
    JsonApiResponse::ok(user)
}
