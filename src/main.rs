//! OpenClaw gateway wrapper.
//!
//! Supervises one gateway process and fronts it with a reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────── WRAPPER ────────────────────────┐
//!                        │                                                          │
//!   Client Request       │  ┌──────────┐    ┌────────────┐   RUNNING   ┌─────────┐  │
//!   ─────────────────────┼─▶│ listener │───▶│  dispatch  │────────────▶│ hyper   │──┼──▶ Gateway
//!                        │  │  :3000   │    │ (by state) │             │ client  │  │    :3001
//!   Client Response      │  └──────────┘    └─────┬──────┘             └─────────┘  │
//!   ◀────────────────────┼────────────────────────┤ STARTING: loading page (503)    │
//!                        │                        └ CRASHED:  log page (500)        │
//!                        │                                                          │
//!                        │  ┌────────────┐  ┌─────────────┐  ┌──────────────────┐   │
//!                        │  │ supervisor │  │   health    │  │ config generator │   │
//!                        │  │ state/logs │◀─│   poller    │  │ (before launch)  │   │
//!                        │  └────────────┘  └─────────────┘  └──────────────────┘   │
//!                        └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use openclaw_wrapper::config::load_or_default;
use openclaw_wrapper::lifecycle::startup;
use openclaw_wrapper::observability::logging::init_tracing;

#[derive(Parser)]
#[command(name = "openclaw-wrapper", version)]
#[command(about = "Supervisor and reverse proxy for the OpenClaw gateway", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "WRAPPER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    init_tracing(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "openclaw-wrapper starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        child_command = %config.child.command,
        child_port = config.child.port,
        log_file = %config.logs.path.display(),
        generator = ?config.generator.mode,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
