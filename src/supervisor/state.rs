//! Supervisor state machine.
//!
//! # States
//! - Starting: child launched, not yet answering HTTP
//! - Running: a probe got a response; traffic is forwarded
//! - Crashed: the child exited; terminal for this child
//!
//! # State Transitions
//! ```text
//! Starting → Running: first successful probe (compare-and-swap)
//! *        → Crashed: child exit event only
//! ```
//!
//! Running is never demoted by failed probes or failed forwards. Because the
//! promotion is a compare-and-swap from Starting, a probe that completes
//! after the exit event cannot undo Crashed.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    Starting = 0,
    Running = 1,
    Crashed = 2,
}

impl From<u8> for SupervisorState {
    fn from(val: u8) -> Self {
        match val {
            1 => SupervisorState::Running,
            2 => SupervisorState::Crashed,
            _ => SupervisorState::Starting,
        }
    }
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Starting => "STARTING",
            SupervisorState::Running => "RUNNING",
            SupervisorState::Crashed => "CRASHED",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free holder of the current state.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SupervisorState::Starting as u8),
        }
    }

    pub fn get(&self) -> SupervisorState {
        SupervisorState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_crashed(&self) -> bool {
        self.get() == SupervisorState::Crashed
    }

    /// Starting → Running. Returns true only for the call that performed it.
    pub fn promote_running(&self) -> bool {
        self.state
            .compare_exchange(
                SupervisorState::Starting as u8,
                SupervisorState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Any → Crashed. Returns the previous state.
    pub fn mark_crashed(&self) -> SupervisorState {
        SupervisorState::from(self.state.swap(SupervisorState::Crashed as u8, Ordering::AcqRel))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
