//! Startup orchestration.
//!
//! Order: metrics → supervisor → listeners bound → child launched →
//! wait for a signal → stop listeners, poller, child.
//! The public port is bound before the launch so the loading page is
//! served from the first moment.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::{serve_admin, setup_admin_router};
use crate::config::WrapperConfig;
use crate::error::WrapperError;
use crate::gateway_config::generator_from_config;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::process::LocalProcessBackend;
use crate::supervisor::Supervisor;

async fn bind(addr: &str) -> Result<TcpListener, WrapperError> {
    TcpListener::bind(addr).await.map_err(|source| WrapperError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Run the wrapper until SIGINT/SIGTERM.
pub async fn run(config: WrapperConfig) -> Result<(), WrapperError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr).map_err(WrapperError::Metrics)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let supervisor = Supervisor::new(
        &config,
        Arc::new(LocalProcessBackend::new()),
        generator_from_config(&config),
    );
    let shutdown = Shutdown::new();

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(supervisor.clone(), &config.pages);
    let public = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let admin = if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(supervisor.clone(), &config.admin);
        Some(tokio::spawn(serve_admin(router, listener, shutdown.subscribe())))
    } else {
        None
    };

    supervisor.start().await;

    signals::wait_for_signal().await;
    tracing::info!("Shutting down");

    shutdown.trigger();
    supervisor.shutdown().await;

    match public.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "Public listener task failed"),
    }
    if let Some(admin) = admin {
        match admin.await {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "Admin listener task failed"),
        }
    }

    Ok(())
}
