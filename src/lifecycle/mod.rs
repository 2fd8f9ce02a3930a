//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → metrics → supervisor → bind listeners → launch child
//!
//! Shutdown (shutdown.rs):
//!     Signal received → listeners stop accepting → poller stopped → child terminated
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Startup errors (bad config, port in use) are fatal; runtime errors never are
//! - A crashed child does not stop the wrapper; only a signal does

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
