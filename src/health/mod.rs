//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Readiness polling (poller.rs):
//!     Owned task, one probe at a time
//!     → GET http://127.0.0.1:<child port>/
//!     → any response: Starting → Running
//!     → failure: wait (constant or capped exponential), probe again
//!     → Crashed observed or handle stopped: task ends
//! ```
//!
//! # Design Decisions
//! - Probes only ever promote; demotion belongs to the child-exit handler
//! - The status code is ignored: a response means the listener is up
//! - The task is owned through `PollerHandle` so it stops deterministically

pub mod poller;

pub use poller::{HealthPoller, PollerHandle, ProbeError};
