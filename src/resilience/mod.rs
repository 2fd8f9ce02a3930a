//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed health probe:
//!     → backoff.rs (delay before the next probe)
//! ```
//!
//! # Design Decisions
//! - Probes retry forever while the child is alive; only the delay varies
//! - Constant interval by default, capped exponential with jitter on request
//! - Proxied requests are never retried (bodies are streamed, not buffered)

pub mod backoff;
