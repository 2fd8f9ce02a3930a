//! Child readiness poller.
//!
//! # Responsibilities
//! - Probe the child's loopback port with a plain HTTP GET
//! - Promote Starting → Running on the first response of any status
//! - Keep probing at the configured delay until the child crashes or the
//!   owning handle stops the task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::HealthConfig;
use crate::observability::metrics;
use crate::resilience::backoff::probe_delay;
use crate::supervisor::{StateCell, SupervisorState};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),
    #[error("connection error: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub struct HealthPoller {
    target: Uri,
    config: HealthConfig,
    state: Arc<StateCell>,
    client: Client<HttpConnector, Body>,
}

impl HealthPoller {
    pub fn new(
        child_addr: SocketAddr,
        config: HealthConfig,
        state: Arc<StateCell>,
    ) -> Result<Self, ProbeError> {
        let raw = format!("http://{}{}", child_addr, config.path);
        let target = raw
            .parse::<Uri>()
            .map_err(|e| ProbeError::InvalidTarget(format!("{raw}: {e}")))?;

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Ok(Self {
            target,
            config,
            state,
            client,
        })
    }

    /// Start polling on a new task.
    pub fn spawn(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        PollerHandle {
            stop: stop_tx,
            task,
        }
    }

    /// Send one probe. Any HTTP response counts as the child serving traffic.
    pub async fn probe(&self) -> Result<StatusCode, ProbeError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.target.clone())
            .header("user-agent", "openclaw-wrapper-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::InvalidTarget(e.to_string()))?;

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response.status()),
            Ok(Err(e)) => Err(ProbeError::Connect(e)),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            target_uri = %self.target,
            interval_ms = self.config.interval_ms,
            backoff = ?self.config.backoff,
            "Health poller starting"
        );

        let mut failures: u32 = 0;
        loop {
            if *stop.borrow() || self.state.is_crashed() {
                break;
            }

            let outcome = tokio::select! {
                outcome = self.probe() => outcome,
                _ = stop.changed() => break,
            };

            match outcome {
                Ok(status) => {
                    failures = 0;
                    if self.state.promote_running() {
                        tracing::info!(
                            status = %status,
                            "Gateway is serving traffic, switching state to RUNNING"
                        );
                        metrics::record_state(SupervisorState::Running);
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    metrics::record_probe_failure();
                    match self.state.get() {
                        SupervisorState::Running => {
                            tracing::warn!(error = %e, "Gateway failing to respond");
                        }
                        SupervisorState::Starting => {
                            tracing::debug!(attempt = failures, error = %e, "Gateway not ready yet");
                        }
                        SupervisorState::Crashed => break,
                    }
                }
            }

            let delay = probe_delay(&self.config, failures);
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = stop.changed() => break,
            }
        }

        tracing::info!(state = %self.state.get(), "Health poller stopped");
    }
}

/// Owned handle to a running poller task.
#[derive(Debug)]
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the task to stop at its next suspension point.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Health poller task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
