//! The supervisor: one child process, one state value.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{ChildConfig, HealthConfig, WrapperConfig};
use crate::gateway_config::ConfigGenerator;
use crate::health::{HealthPoller, PollerHandle};
use crate::observability::metrics;
use crate::process::{ExitOutcome, LaunchSpec, ProcessBackend, ProcessId, SpawnedProcess};
use crate::supervisor::diagnostics::Diagnostics;
use crate::supervisor::state::{StateCell, SupervisorState};

/// How long the exit handler lets already-written output reach the log file.
/// The pump keeps running afterwards, and the error page re-reads the file.
const OUTPUT_FLUSH_GRACE: Duration = Duration::from_millis(100);

/// The currently running child.
#[derive(Debug, Clone, Serialize)]
pub struct ChildRecord {
    pub id: ProcessId,
    pub pid: Option<u32>,
    pub command: String,
    /// Seconds since the Unix epoch.
    pub started_at: u64,
}

pub struct Supervisor {
    child_config: ChildConfig,
    health_config: HealthConfig,
    state: Arc<StateCell>,
    diagnostics: Arc<Diagnostics>,
    backend: Arc<dyn ProcessBackend>,
    generator: Arc<dyn ConfigGenerator>,
    child: ArcSwapOption<ChildRecord>,
    last_exit: ArcSwapOption<ExitOutcome>,
    poller: Mutex<Option<PollerHandle>>,
    launched: AtomicBool,
    created_at: Instant,
}

impl Supervisor {
    pub fn new(
        config: &WrapperConfig,
        backend: Arc<dyn ProcessBackend>,
        generator: Arc<dyn ConfigGenerator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            child_config: config.child.clone(),
            health_config: config.health.clone(),
            state: Arc::new(StateCell::new()),
            diagnostics: Arc::new(Diagnostics::new(config.logs.path.clone(), config.logs.echo)),
            backend,
            generator,
            child: ArcSwapOption::empty(),
            last_exit: ArcSwapOption::empty(),
            poller: Mutex::new(None),
            launched: AtomicBool::new(false),
            created_at: Instant::now(),
        })
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }

    #[cfg(test)]
    pub(crate) fn state_cell(&self) -> &StateCell {
        &self.state
    }

    pub fn child(&self) -> Option<Arc<ChildRecord>> {
        self.child.load_full()
    }

    pub fn last_exit(&self) -> Option<Arc<ExitOutcome>> {
        self.last_exit.load_full()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn backend(&self) -> &Arc<dyn ProcessBackend> {
        &self.backend
    }

    /// Loopback address the child is expected to bind.
    pub fn child_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.child_config.port))
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Regenerate configuration, launch the child and start polling it.
    ///
    /// Every failure is absorbed here: a generator error is logged and the
    /// launch proceeds, a spawn error is treated as an immediate exit.
    /// Only the first call launches; there is no restart after a crash.
    pub async fn start(self: &Arc<Self>) {
        if self.launched.swap(true, Ordering::SeqCst) {
            tracing::warn!(state = %self.state(), "Gateway already launched, ignoring start");
            return;
        }

        tracing::info!(command = %self.child_config.command, port = self.child_config.port, "Launching gateway");
        metrics::record_state(self.state());

        if let Err(e) = self.generator.generate().await {
            tracing::error!(generator = self.generator.name(), error = %e, "Config generation failed, launching anyway");
        }

        if let Err(e) = self.diagnostics.reset().await {
            tracing::warn!(path = %self.diagnostics.path().display(), error = %e, "Could not reset log file");
        }

        let spec = self.launch_spec();
        match self.backend.spawn(&spec).await {
            Ok(spawned) => self.attach(spawned, spec.command_line()).await,
            Err(e) => {
                tracing::error!(error = %e, "Gateway failed to spawn");
                self.diagnostics.record_failure(&e.to_string()).await;
                self.handle_exit(ExitOutcome { code: None }).await;
            }
        }
    }

    /// Environment and command line for the child.
    pub fn launch_spec(&self) -> LaunchSpec {
        let mut env: std::collections::BTreeMap<String, String> = std::env::vars().collect();
        env.extend(self.child_config.env.clone());
        env.insert(
            self.child_config.port_env.clone(),
            self.child_config.port.to_string(),
        );

        LaunchSpec {
            program: self.child_config.command.clone(),
            args: self.child_config.args.clone(),
            env,
            working_dir: self.child_config.working_dir.clone(),
        }
    }

    async fn attach(self: &Arc<Self>, spawned: SpawnedProcess, command: String) {
        let SpawnedProcess {
            id,
            pid,
            mut output,
            exit,
        } = spawned;

        tracing::info!(process_id = %id, pid = ?pid, "Gateway process started");
        self.child.store(Some(Arc::new(ChildRecord {
            id,
            pid,
            command,
            started_at: unix_now(),
        })));

        let diagnostics = self.diagnostics.clone();
        let mut pump: JoinHandle<()> = tokio::spawn(async move {
            while let Some(chunk) = output.recv().await {
                diagnostics.record(&chunk).await;
            }
        });

        match HealthPoller::new(self.child_addr(), self.health_config.clone(), self.state.clone()) {
            Ok(poller) => {
                *self.poller.lock().await = Some(poller.spawn());
            }
            Err(e) => tracing::error!(error = %e, "Health poller not started"),
        }

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = exit.await.unwrap_or_else(|_| {
                tracing::warn!(process_id = %id, "Exit notification dropped");
                ExitOutcome { code: None }
            });
            if time::timeout(OUTPUT_FLUSH_GRACE, &mut pump).await.is_err() {
                tracing::debug!(process_id = %id, "Output still open after exit, leaving it attached");
            }
            supervisor.handle_exit(outcome).await;
        });
    }

    /// The only path into Crashed.
    async fn handle_exit(&self, outcome: ExitOutcome) {
        tracing::warn!(exit_code = ?outcome.code, "Gateway exited, no automatic restart");

        let previous = self.state.mark_crashed();
        self.child.store(None);
        metrics::record_child_exit(outcome.code);
        self.last_exit.store(Some(Arc::new(outcome)));
        metrics::record_state(SupervisorState::Crashed);

        if let Some(poller) = self.poller.lock().await.take() {
            poller.stop();
        }
        tracing::info!(previous = %previous, "State switched to CRASHED");
    }

    /// Stop polling and terminate the child.
    pub async fn shutdown(&self) {
        let poller = self.poller.lock().await.take();
        if let Some(poller) = poller {
            poller.shutdown().await;
        }
        if let Some(child) = self.child() {
            if let Err(e) = self.backend.terminate(child.id).await {
                tracing::warn!(process_id = %child.id, error = %e, "Failed to terminate gateway");
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
