//! Admin API on a separate listener.
//!
//! Kept off the public port so every public request stays subject to the
//! state dispatch.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AdminConfig;
use crate::supervisor::Supervisor;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub supervisor: Arc<Supervisor>,
    pub api_key: Option<Arc<str>>,
    pub readiness_timeout_ms: u64,
}

pub fn setup_admin_router(supervisor: Arc<Supervisor>, config: &AdminConfig) -> Router {
    let state = AdminState {
        supervisor,
        api_key: config.api_key.as_deref().map(Arc::from),
        readiness_timeout_ms: config.readiness_timeout_ms,
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/logs", get(get_logs))
        .route("/admin/processes", get(get_processes))
        .route("/admin/processes/{id}/logs", get(get_process_logs))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin router until shutdown.
pub async fn serve_admin(
    router: Router,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin listener ready");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
