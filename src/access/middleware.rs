//! axum middleware applying the [`AccessGate`](super::AccessGate) to every
//! request before routing.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::{debug, error, warn};

use super::AccessReason;
use crate::handlers::plain_error;
use crate::state::SharedState;

const FORBIDDEN: &str = "Forbidden\n";
const FORBIDDEN_NOT_MEMBER: &str = "Forbidden: Only accessible from the overlay network\n";

/// Rejects callers outside the overlay network with 403; the wrapped
/// handler never runs for them.
pub async fn require_overlay(
    State(state): State<SharedState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let remote = remote.to_string();
    let path = request.uri().path().to_string();

    // The roster lookup may run an external command.
    let gate_state = state.clone();
    let gate_remote = remote.clone();
    let decision =
        match tokio::task::spawn_blocking(move || gate_state.gate.decide(&gate_remote)).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(remote = %remote, "Access check failed: {}", e);
                return plain_error(StatusCode::FORBIDDEN, FORBIDDEN);
            }
        };

    if decision.allow {
        debug!(remote = %remote, path = %path, reason = %decision.reason, "Access granted");
        return next.run(request).await;
    }

    warn!(
        remote = %remote,
        host = %decision.host,
        path = %path,
        reason = %decision.reason,
        "Blocked request from outside the overlay network"
    );

    let body = match decision.reason {
        AccessReason::InvalidAddress => FORBIDDEN,
        _ => FORBIDDEN_NOT_MEMBER,
    };
    plain_error(StatusCode::FORBIDDEN, body)
}
