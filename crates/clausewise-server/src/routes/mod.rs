//! HTTP route handlers.

pub mod chat;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use axum::Router;
use clausewise_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Header carrying the caller identity set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new().merge(chat::routes())
}

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

/// Map a pipeline error onto an HTTP status.
pub(crate) fn api_error(err: Error) -> ApiError {
    let status = match &err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match err {
        Error::Extraction(m) | Error::EmptyInput(m) | Error::PayloadTooLarge(m) => m,
        other => other.to_string(),
    };
    error_body(status, message)
}

/// Caller identity, or 401 when the header is missing or blank.
pub(crate) fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "missing caller identity"))
}
