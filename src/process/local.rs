//! Process backend over `tokio::process`.
//!
//! # Responsibilities
//! - Spawn the child with piped stdout/stderr and a clean environment
//! - Forward raw output chunks and keep a bounded copy per process
//! - Report the exit as soon as the process is reaped; readers keep going
//!   until EOF so a grandchild holding a pipe cannot delay it
//! - Kill on terminate, probe ports for readiness

use std::collections::HashMap;
use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{self, Instant};

use super::{
    ExitOutcome, LaunchSpec, OutputChunk, OutputStream, ProcessBackend, ProcessError, ProcessId,
    ProcessInfo, ProcessStatus, SpawnedProcess,
};

const READ_CHUNK_BYTES: usize = 8 * 1024;
const LOG_BUFFER_MAX_BYTES: usize = 256 * 1024;
const READINESS_RETRY: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct LogBuffer {
    bytes: Vec<u8>,
}

impl LogBuffer {
    fn push(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
        if self.bytes.len() > LOG_BUFFER_MAX_BYTES {
            let excess = self.bytes.len() - LOG_BUFFER_MAX_BYTES;
            self.bytes.drain(..excess);
        }
    }

    fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug)]
struct ProcessEntry {
    command: String,
    pid: Option<u32>,
    status: ProcessStatus,
    started_at: u64,
    kill: Option<oneshot::Sender<()>>,
    logs: Arc<Mutex<LogBuffer>>,
}

/// Runs children as local OS processes.
#[derive(Clone, Debug, Default)]
pub struct LocalProcessBackend {
    inner: Arc<Mutex<HashMap<ProcessId, ProcessEntry>>>,
}

impl LocalProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessBackend for LocalProcessBackend {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<SpawnedProcess, ProcessError> {
        let command_line = spec.command_line();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let id = ProcessId::new();
        let pid = child.id();
        let logs = Arc::new(Mutex::new(LogBuffer::default()));
        let (output_tx, output_rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_output(
                stdout,
                OutputStream::Stdout,
                output_tx.clone(),
                logs.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_output(
                stderr,
                OutputStream::Stderr,
                output_tx.clone(),
                logs.clone(),
            ));
        }
        drop(output_tx);

        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        self.inner.lock().await.insert(
            id,
            ProcessEntry {
                command: command_line.clone(),
                pid,
                status: ProcessStatus::Running,
                started_at: unix_now(),
                kill: Some(kill_tx),
                logs,
            },
        );

        tracing::debug!(process_id = %id, pid = ?pid, command = %command_line, "Process spawned");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let waited = tokio::select! {
                res = child.wait() => res,
                _ = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(process_id = %id, error = %e, "Failed to kill process");
                    }
                    child.wait().await
                }
            };

            let code = match waited {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(process_id = %id, error = %e, "Failed to wait on process");
                    None
                }
            };

            if let Some(entry) = inner.lock().await.get_mut(&id) {
                entry.status = ProcessStatus::Exited { code };
                entry.kill = None;
            }

            let _ = exit_tx.send(ExitOutcome { code });
        });

        Ok(SpawnedProcess {
            id,
            pid,
            output: output_rx,
            exit: exit_rx,
        })
    }

    async fn list(&self) -> Vec<ProcessInfo> {
        let inner = self.inner.lock().await;
        let mut infos: Vec<ProcessInfo> = inner
            .iter()
            .map(|(id, entry)| ProcessInfo {
                id: *id,
                pid: entry.pid,
                command: entry.command.clone(),
                status: entry.status.clone(),
                started_at: entry.started_at,
            })
            .collect();
        infos.sort_by_key(|info| info.started_at);
        infos
    }

    async fn wait_for_readiness(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProcessError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ProcessError::NotReady { addr, timeout });
            }
            if let Ok(Ok(_)) = time::timeout(remaining, TcpStream::connect(addr)).await {
                return Ok(());
            }
            time::sleep(READINESS_RETRY.min(deadline.saturating_duration_since(Instant::now()))).await;
        }
    }

    async fn terminate(&self, id: ProcessId) -> Result<(), ProcessError> {
        let mut inner = self.inner.lock().await;
        let entry = inner.get_mut(&id).ok_or(ProcessError::NotFound(id))?;
        if let Some(kill) = entry.kill.take() {
            tracing::info!(process_id = %id, pid = ?entry.pid, "Terminating process");
            let _ = kill.send(());
        }
        Ok(())
    }

    async fn fetch_logs(&self, id: ProcessId) -> Result<String, ProcessError> {
        let logs = {
            let inner = self.inner.lock().await;
            inner.get(&id).ok_or(ProcessError::NotFound(id))?.logs.clone()
        };
        let buffer = logs.lock().await;
        Ok(buffer.to_string_lossy())
    }
}

async fn pump_output<R>(
    mut reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<OutputChunk>,
    logs: Arc<Mutex<LogBuffer>>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let data = buf[..n].to_vec();
                logs.lock().await.push(&data);
                // Keep reading after the receiver is gone so the child never blocks on a full pipe.
                let _ = tx.send(OutputChunk { stream, data });
            }
            Err(e) => {
                tracing::debug!(stream = ?stream, error = %e, "Output stream closed with error");
                break;
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
