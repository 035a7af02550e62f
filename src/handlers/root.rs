//! Root endpoint handler: reports the machine's hostname.

use axum::{http::header, response::IntoResponse};
use tracing::{debug, instrument, warn};

/// Hostname of the local machine, or `"unknown"` when it cannot be resolved.
pub fn local_hostname() -> String {
    match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                "unknown".to_string()
            } else {
                name
            }
        }
        Err(e) => {
            warn!("Failed to get hostname: {}", e);
            "unknown".to_string()
        }
    }
}

/// Handler for the root `/` endpoint.
#[instrument]
pub async fn root_handler() -> impl IntoResponse {
    debug!("Processing / request");

    let hostname = local_hostname();
    (
        [(header::CONTENT_TYPE, "text/plain")],
        format!("hostname: {}\n", hostname),
    )
}
