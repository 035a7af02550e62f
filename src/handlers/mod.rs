//! HTTP endpoint handlers for the agent.
//!
//! - `/`: hostname of the machine
//! - `/metrics`: system metrics in Prometheus text format
//! - `/shutdown`: power the machine off (POST only)
//!
//! Every response body is plain text.

pub mod metrics;
pub mod root;
pub mod shutdown;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub use metrics::metrics_handler;
pub use root::root_handler;
pub use shutdown::shutdown_handler;

/// Error response: `text/plain; charset=utf-8` with content sniffing disabled.
pub fn plain_error(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body.into(),
    )
        .into_response()
}

/// 405 for GET-only routes.
pub async fn method_not_allowed() -> Response {
    plain_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed\n")
}

/// 405 for `/shutdown`.
pub async fn post_only() -> Response {
    plain_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed (use POST)\n")
}

/// 404 for unknown paths.
pub async fn not_found() -> Response {
    plain_error(StatusCode::NOT_FOUND, "404 page not found\n")
}
