//! Process backend abstraction.
//!
//! # Data Flow
//! ```text
//! supervisor launcher
//!     → ProcessBackend::spawn(LaunchSpec)
//!     → SpawnedProcess { output channel, exit notification }
//!
//! admin API / shutdown
//!     → list / fetch_logs / wait_for_readiness / terminate
//! ```
//!
//! # Design Decisions
//! - The supervisor only sees this trait, never the OS process type
//! - Output arrives as raw chunks in arrival order on one channel
//! - Exit is reported exactly once over a oneshot

pub mod local;

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

pub use local::LocalProcessBackend;

/// Identifier assigned by a backend to each spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProcessId(Uuid);

impl ProcessId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything needed to start the child.
#[derive(Debug, Clone, Default)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Full environment for the child; the backend does not inherit anything.
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchSpec {
    /// Human-readable command line for logs and listings.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Which standard stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One read from a child's stdout or stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub data: Vec<u8>,
}

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitOutcome {
    /// Exit code; `None` when terminated by a signal or when waiting failed.
    pub code: Option<i32>,
}

/// Handle returned from a successful spawn.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub id: ProcessId,
    pub pid: Option<u32>,
    /// Closed once both streams reach EOF.
    pub output: mpsc::UnboundedReceiver<OutputChunk>,
    /// Fires once when the process exits.
    pub exit: oneshot::Receiver<ExitOutcome>,
}

/// Lifecycle status reported by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Exited { code: Option<i32> },
}

/// Snapshot of a process known to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub id: ProcessId,
    pub pid: Option<u32>,
    pub command: String,
    #[serde(flatten)]
    pub status: ProcessStatus,
    /// Seconds since the Unix epoch.
    pub started_at: u64,
}

/// Errors surfaced by process backends.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown process {0}")]
    NotFound(ProcessId),
    #[error("{addr} did not accept connections within {timeout:?}")]
    NotReady { addr: SocketAddr, timeout: Duration },
    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Narrow capability set the supervisor needs from a process runtime.
#[async_trait]
pub trait ProcessBackend: Send + Sync {
    /// Start a process and wire up its output and exit notification.
    async fn spawn(&self, spec: &LaunchSpec) -> Result<SpawnedProcess, ProcessError>;

    /// Processes started through this backend, running or exited.
    async fn list(&self) -> Vec<ProcessInfo>;

    /// Wait until `addr` accepts a TCP connection or `timeout` elapses.
    async fn wait_for_readiness(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProcessError>;

    /// Stop a running process. Exited processes are left alone.
    async fn terminate(&self, id: ProcessId) -> Result<(), ProcessError>;

    /// Buffered combined output of a process.
    async fn fetch_logs(&self, id: ProcessId) -> Result<String, ProcessError>;
}
