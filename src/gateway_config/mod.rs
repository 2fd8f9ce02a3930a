//! Gateway configuration generation.
//!
//! # Data Flow
//! ```text
//! launcher (before every spawn)
//!     → ConfigGenerator::generate()
//!         builtin.rs  (env snapshot → JSON document → atomic write)
//!         command.rs  (external script writes the document)
//!         NoopGenerator (leave the file alone)
//!     → patch.rs (optional provider injection into whatever is on disk)
//! ```
//!
//! # Design Decisions
//! - Failures are reported to the caller, which logs and launches anyway
//! - The gateway's schema is external; documents are not validated here
//! - Secrets from the environment are never logged, only their presence

pub mod builtin;
pub mod command;
pub mod patch;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::fs;

use crate::config::{GeneratorMode, WrapperConfig};

pub use builtin::BuiltinGenerator;
pub use command::CommandGenerator;
pub use patch::PatchingGenerator;

/// Environment variables visible to a generator.
pub type EnvSnapshot = BTreeMap<String, String>;

/// Capture the wrapper's current environment.
pub fn process_env() -> EnvSnapshot {
    std::env::vars().collect()
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize gateway config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("generator command is empty")]
    EmptyCommand,
}

/// Produces the gateway's configuration before a launch.
#[async_trait]
pub trait ConfigGenerator: Send + Sync {
    async fn generate(&self) -> Result<(), GenerateError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Leaves the configuration on disk untouched.
#[derive(Debug, Default)]
pub struct NoopGenerator;

#[async_trait]
impl ConfigGenerator for NoopGenerator {
    async fn generate(&self) -> Result<(), GenerateError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Build the generator chain described by the wrapper configuration.
pub fn generator_from_config(config: &WrapperConfig) -> Arc<dyn ConfigGenerator> {
    let generator = &config.generator;
    let base: Arc<dyn ConfigGenerator> = match generator.mode {
        GeneratorMode::Builtin => Arc::new(BuiltinGenerator::new(generator.clone(), config.child.port)),
        GeneratorMode::Command => Arc::new(CommandGenerator::new(generator.command.clone())),
        GeneratorMode::Disabled => Arc::new(NoopGenerator),
    };

    if generator.patch {
        Arc::new(PatchingGenerator::new(
            base,
            generator.output_path.clone(),
            generator.model.clone(),
        ))
    } else {
        base
    }
}

/// Write via a temp file and rename so the gateway never reads a partial file.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), GenerateError> {
    let wrap = |source| GenerateError::Write {
        path: path.display().to_string(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent).await.map_err(wrap)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}-{}",
        path.file_name().and_then(|v| v.to_str()).unwrap_or("config"),
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    ));

    fs::write(&tmp_path, content).await.map_err(wrap)?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(wrap(e));
    }
    Ok(())
}
