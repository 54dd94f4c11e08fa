use std::any::Any;

use axum::{http::StatusCode, response::Response};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{error::AppError, response::error_response};

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Turns a handler panic into a 500 envelope. Panic text only reaches the
/// client in debug builds.
pub fn catch_panic_layer() -> CatchPanicLayer<fn(PanicPayload) -> Response> {
    CatchPanicLayer::custom(panic_response)
}

fn panic_response(payload: PanicPayload) -> Response {
    let message = if cfg!(debug_assertions) {
        let details = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("unknown panic");
        format!("Internal server error: {details}")
    } else {
        "Internal server error".to_owned()
    };

    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &AppError::internal(message),
    )
}
