use axum::{
    body::to_bytes,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    response::{error_response, log_app_error},
};

const MAX_ERROR_BODY_BYTES: usize = 16 * 1024;

/// Rewrites plain-text error bodies (extractor rejections, unmatched routes) into
/// the JSON error envelope. Status codes are kept.
pub async fn json_error_middleware(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();
    if !needs_envelope(status, response.headers().get(header::CONTENT_TYPE)) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let text = to_bytes(body, MAX_ERROR_BODY_BYTES)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_owned())
        .unwrap_or_default();
    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_owned()
    } else {
        text
    };

    let err = AppError::from_status(status, message);
    if status.is_server_error() {
        log_app_error(&err, status);
    }

    let mut rewritten = error_response(status, &err);
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    for (name, value) in &parts.headers {
        rewritten.headers_mut().append(name.clone(), value.clone());
    }
    rewritten
}

fn needs_envelope(status: StatusCode, content_type: Option<&HeaderValue>) -> bool {
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    let is_json = content_type
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let value = value.to_ascii_lowercase();
            value.starts_with("application/json") || value.contains("+json")
        })
        .unwrap_or(false);
    !is_json
}
