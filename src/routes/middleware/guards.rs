use std::{marker::PhantomData, sync::Arc};

use axum::{extract::FromRequestParts, http::header};

use crate::{
    auth::{BearerToken, Principal, RequiredRole, SessionResolver},
    error::AppError,
    state::AppState,
};

// Raw bearer value, cached so logout and password change can use it.
impl FromRequestParts<Arc<AppState>> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = parts.extensions.get::<BearerToken>().cloned() {
            return Ok(token);
        }

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = BearerToken(SessionResolver::bearer_token(header)?.to_string());

        parts.extensions.insert(token.clone());
        Ok(token)
    }
}

// Auth guard: resolve the session once per request.
impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>().cloned() {
            return Ok(principal);
        }

        let token = BearerToken::from_request_parts(parts, state).await?;
        let principal = state.resolver.resolve(token.as_str()).await?;
        parts.extensions.insert(principal.clone());
        Ok(principal)
    }
}

pub type AuthGuard = Principal;

pub struct AuthRoleGuard<R: RequiredRole> {
    pub principal: Principal,
    _marker: PhantomData<R>,
}

impl<R> FromRequestParts<Arc<AppState>> for AuthRoleGuard<R>
where
    R: RequiredRole,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;

        if !principal.has_role(&R::required()) {
            return Err(AppError::forbidden("Missing required role"));
        }

        Ok(Self {
            principal,
            _marker: PhantomData,
        })
    }
}
