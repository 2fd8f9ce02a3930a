//! Metrics collection and exposition.
//!
//! # Metrics
//! - `wrapper_requests_total` (counter): requests by method, status, outcome
//! - `wrapper_request_duration_seconds` (histogram): latency by outcome
//! - `wrapper_state` (gauge): 0=starting, 1=running, 2=crashed
//! - `wrapper_probe_failures_total` (counter): failed health probes
//! - `wrapper_child_exits_total` (counter): child exits by code
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests never need the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::supervisor::SupervisorState;

/// How a public request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Proxied,
    ProxyError,
    Loading,
    Crashed,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Proxied => "proxied",
            RequestOutcome::ProxyError => "proxy_error",
            RequestOutcome::Loading => "loading",
            RequestOutcome::Crashed => "crashed",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| e.to_string())?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: RequestOutcome, start: Instant) {
    counter!(
        "wrapper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("wrapper_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_state(state: SupervisorState) {
    gauge!("wrapper_state").set(state as u8 as f64);
}

pub fn record_probe_failure() {
    counter!("wrapper_probe_failures_total").increment(1);
}

pub fn record_child_exit(code: Option<i32>) {
    let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    counter!("wrapper_child_exits_total", "code" => code).increment(1);
}
