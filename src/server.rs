//! HTTP router and server loop.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::access::require_overlay;
use crate::handlers::{
    method_not_allowed, metrics_handler, not_found, post_only, root_handler, shutdown_handler,
};
use crate::state::SharedState;

/// Builds the application router.
///
/// Every route, the wrong-method answers and the unknown-path fallback sit
/// behind the access gate. With `enable_shutdown == false` the `/shutdown`
/// route is left out and answers 404 like any other unknown path.
pub fn router(state: SharedState, enable_shutdown: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler).fallback(method_not_allowed))
        .route("/metrics", get(metrics_handler).fallback(method_not_allowed));

    if enable_shutdown {
        app = app.route("/shutdown", post(shutdown_handler).fallback(post_only));
    }

    app.fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_overlay))
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// Peer addresses are attached to each request for the access gate.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("overlay-node-agent listening on http://{}", addr);
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
