//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor, poller, router produce:
//!     → logging.rs (structured log events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → container stdout/stderr (alongside tagged child output)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Each public request gets a span with a generated request id
//! - Child output is echoed raw, never re-formatted through tracing
//! - Metrics are cheap and no-ops without an installed recorder

pub mod logging;
pub mod metrics;
