//! Child process supervision.
//!
//! # Data Flow
//! ```text
//! Supervisor::start
//!     → ConfigGenerator::generate (errors logged, launch continues)
//!     → Diagnostics::reset (truncate log file)
//!     → ProcessBackend::spawn
//!         ok:  output channel → Diagnostics::record (log file, echo, last stderr)
//!              HealthPoller spawned (Starting → Running)
//!              exit notification → handle_exit (→ Crashed, poller stopped)
//!         err: message recorded → handle_exit
//! ```
//!
//! # Design Decisions
//! - One supervisor owns one child; no restart after a crash
//! - State lives in an atomic cell shared with the poller
//! - The exit handler waits briefly for buffered output so the error page
//!   shows the child's last words

pub mod runtime;
pub mod diagnostics;
pub mod state;

pub use runtime::{ChildRecord, Supervisor};
pub use diagnostics::Diagnostics;
pub use state::{StateCell, SupervisorState};
