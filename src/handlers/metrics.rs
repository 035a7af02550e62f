//! Metrics endpoint handler.
//!
//! Collection touches the filesystem and may spawn helper commands, so it runs
//! on the blocking pool. Individual counters that fail are reported as zero by
//! the backend; only a backend that cannot collect at all yields a 500.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::handlers::plain_error;
use crate::metrics::exposition::{self, CONTENT_TYPE};
use crate::platform::PlatformError;
use crate::state::SharedState;

/// Failure of a whole metrics collection.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("collection task failed: {0}")]
    Task(String),
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        error!("Failed to get metrics: {}", self);
        plain_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to get metrics: {}\n", self),
        )
    }
}

/// Handler for the `/metrics` endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<Response, MetricsError> {
    debug!("Processing /metrics request");
    let start = Instant::now();

    let collector = state.clone();
    let metrics =
        tokio::task::spawn_blocking(move || collector.backend.collect(&collector.sampler))
            .await
            .map_err(|e| MetricsError::Task(e.to_string()))??;

    let body = exposition::render(&metrics);
    debug!(
        cpu_percent = metrics.cpu_percent,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Metrics collected"
    );

    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}
