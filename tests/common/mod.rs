//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use openclaw_wrapper::config::{GeneratorMode, WrapperConfig};
use openclaw_wrapper::gateway_config::{ConfigGenerator, GenerateError};
use openclaw_wrapper::lifecycle::Shutdown;
use openclaw_wrapper::process::{
    ExitOutcome, LaunchSpec, OutputChunk, OutputStream, ProcessBackend, ProcessError, ProcessId,
    ProcessInfo, ProcessStatus, SpawnedProcess,
};
use openclaw_wrapper::{HttpServer, Supervisor, SupervisorState};

/// Reserve a loopback port that is free right now.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Config tuned for tests: fast probes, quiet logs, no generator.
pub fn test_config(child_port: u16, log_dir: &Path) -> WrapperConfig {
    let mut config = WrapperConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.child.port = child_port;
    config.health.interval_ms = 25;
    config.health.timeout_ms = 500;
    config.health.max_delay_ms = 100;
    config.logs.path = log_dir.join("openclaw.log");
    config.logs.echo = false;
    config.generator.mode = GeneratorMode::Disabled;
    config
}

/// Serve the public router on an ephemeral port.
pub async fn start_wrapper(supervisor: Arc<Supervisor>, config: &WrapperConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(supervisor, &config.pages);
    tokio::spawn(server.run(listener, shutdown.subscribe()));
    (addr, shutdown)
}

/// Poll until the supervisor reaches `state` or the deadline passes.
pub async fn wait_for_state(supervisor: &Supervisor, state: SupervisorState, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if supervisor.state() == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    supervisor.state() == state
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock gateway.
///
/// `f` receives the zero-based connection index and returns `None` to drop
/// the connection without answering, which a probe sees as a failure.
pub async fn start_programmable_child<F, Fut>(addr: SocketAddr, f: F) -> Arc<AtomicUsize>
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<(u16, String)>> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let Some((status, body)) = f(index).await else {
                            return;
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    connections
}

#[derive(Default)]
struct FakeChild {
    id: Option<ProcessId>,
    output: Option<mpsc::UnboundedSender<OutputChunk>>,
    exit: Option<oneshot::Sender<ExitOutcome>>,
    exited: Option<ExitOutcome>,
    command: String,
}

/// Scripted process backend: the test decides what the child prints and when it exits.
#[derive(Default)]
pub struct FakeBackend {
    child: Mutex<FakeChild>,
    spawns: AtomicUsize,
    fail_spawn: bool,
    last_spec: Mutex<Option<LaunchSpec>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A backend whose every spawn fails as if the program were missing.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_spawn: true,
            ..Self::default()
        })
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn last_spec(&self) -> Option<LaunchSpec> {
        self.last_spec.lock().unwrap().clone()
    }

    pub fn emit(&self, stream: OutputStream, data: &str) {
        let child = self.child.lock().unwrap();
        if let Some(output) = &child.output {
            let _ = output.send(OutputChunk {
                stream,
                data: data.as_bytes().to_vec(),
            });
        }
    }

    /// Close the output streams and report an exit.
    pub fn exit(&self, code: Option<i32>) {
        let mut child = self.child.lock().unwrap();
        child.output = None;
        child.exited = Some(ExitOutcome { code });
        if let Some(exit) = child.exit.take() {
            let _ = exit.send(ExitOutcome { code });
        }
    }
}

#[async_trait]
impl ProcessBackend for FakeBackend {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<SpawnedProcess, ProcessError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());

        if self.fail_spawn {
            return Err(ProcessError::Spawn {
                command: spec.command_line(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
            });
        }

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let id = ProcessId::new();

        *self.child.lock().unwrap() = FakeChild {
            id: Some(id),
            output: Some(output_tx),
            exit: Some(exit_tx),
            exited: None,
            command: spec.command_line(),
        };

        Ok(SpawnedProcess {
            id,
            pid: Some(4242),
            output: output_rx,
            exit: exit_rx,
        })
    }

    async fn list(&self) -> Vec<ProcessInfo> {
        let child = self.child.lock().unwrap();
        child
            .id
            .map(|id| ProcessInfo {
                id,
                pid: Some(4242),
                command: child.command.clone(),
                status: match &child.exited {
                    Some(outcome) => ProcessStatus::Exited { code: outcome.code },
                    None => ProcessStatus::Running,
                },
                started_at: 0,
            })
            .into_iter()
            .collect()
    }

    async fn wait_for_readiness(&self, addr: SocketAddr, timeout: Duration) -> Result<(), ProcessError> {
        match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Ok(()),
            _ => Err(ProcessError::NotReady { addr, timeout }),
        }
    }

    async fn terminate(&self, id: ProcessId) -> Result<(), ProcessError> {
        if self.child.lock().unwrap().id != Some(id) {
            return Err(ProcessError::NotFound(id));
        }
        self.exit(None);
        Ok(())
    }

    async fn fetch_logs(&self, id: ProcessId) -> Result<String, ProcessError> {
        if self.child.lock().unwrap().id == Some(id) {
            Ok(String::new())
        } else {
            Err(ProcessError::NotFound(id))
        }
    }
}

/// Generator that always fails, counting its invocations.
#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ConfigGenerator for FailingGenerator {
    async fn generate(&self) -> Result<(), GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerateError::EmptyCommand)
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
