//! Shutdown endpoint handler.
//!
//! `POST /shutdown` answers immediately and powers the machine off from a
//! detached task. `force=true` (exactly) requests a forced power-off; any
//! other value, or none, a graceful one.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use tracing::{info, instrument};

use crate::shutdown::ShutdownMode;
use crate::state::SharedState;

/// Reads the first `force` query parameter.
pub fn requested_mode(params: &[(String, String)]) -> ShutdownMode {
    let force = params
        .iter()
        .find(|(key, _)| key == "force")
        .is_some_and(|(_, value)| value == "true");
    ShutdownMode::from_force(force)
}

/// Handler for the `/shutdown` endpoint.
#[instrument(skip(state, params))]
pub async fn shutdown_handler(
    State(state): State<SharedState>,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let mode = requested_mode(&params);
    info!(mode = %mode, "Shutdown requested via web API");

    state.actuator.spawn(mode);

    (
        [(header::CONTENT_TYPE, "text/plain")],
        format!("Shutdown initiated ({})...\n", mode),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_requested_mode() {
        assert_eq!(requested_mode(&params(&[])), ShutdownMode::Graceful);
        assert_eq!(requested_mode(&params(&[("force", "true")])), ShutdownMode::Forced);
        assert_eq!(requested_mode(&params(&[("force", "TRUE")])), ShutdownMode::Graceful);
        assert_eq!(requested_mode(&params(&[("force", "1")])), ShutdownMode::Graceful);
        assert_eq!(
            requested_mode(&params(&[("force", "false"), ("force", "true")])),
            ShutdownMode::Graceful
        );
    }
}
