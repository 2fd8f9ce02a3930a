//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wrapper.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the wrapper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WrapperConfig {
    /// Public listener configuration.
    pub listener: ListenerConfig,

    /// The supervised gateway process.
    pub child: ChildConfig,

    /// Health probe settings.
    pub health: HealthConfig,

    /// Captured child output.
    pub logs: LogConfig,

    /// Gateway configuration generation before each launch.
    pub generator: GeneratorConfig,

    /// Loading and error page rendering.
    pub pages: PagesConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Child process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChildConfig {
    /// Executable to launch.
    pub command: String,

    /// Arguments passed to the executable.
    pub args: Vec<String>,

    /// Loopback port the child is expected to bind.
    pub port: u16,

    /// Environment variable carrying the port override.
    pub port_env: String,

    /// Working directory for the child (inherits the wrapper's when unset).
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables, applied before the port override.
    pub env: BTreeMap<String, String>,
}

impl Default for ChildConfig {
    fn default() -> Self {
        Self {
            command: "openclaw".to_string(),
            args: Vec::new(),
            port: 3001,
            port_env: "PORT".to_string(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

/// Delay policy between health probes.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// Fixed interval between probes.
    #[default]
    Constant,
    /// Doubling delay starting at the interval, capped at `max_delay_ms`.
    Exponential,
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Delay between probes in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path to probe on the child port.
    pub path: String,

    /// Delay policy applied after failed probes.
    pub backoff: BackoffPolicy,

    /// Upper bound for exponential delays in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_ms: 5000,
            path: "/".to_string(),
            backoff: BackoffPolicy::Constant,
            max_delay_ms: 10_000,
        }
    }
}

/// Captured output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file mirroring the child's stdout and stderr.
    pub path: PathBuf,

    /// Echo child output to the wrapper's own stdout/stderr.
    pub echo: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/root/openclaw.log"),
            echo: true,
        }
    }
}

/// How the gateway configuration is produced before launch.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// Build the document from environment variables in-process.
    #[default]
    Builtin,
    /// Run an external command that writes the document.
    Command,
    /// Leave whatever is on disk untouched.
    Disabled,
}

/// Gateway configuration generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mode: GeneratorMode,

    /// Program and arguments for `mode = "command"`.
    pub command: Vec<String>,

    /// Where the gateway reads its configuration.
    pub output_path: PathBuf,

    /// Inject the provider block into the written document after generation.
    pub patch: bool,

    /// Model identifier for the provider block.
    pub model: String,

    /// Display name of the default agent.
    pub agent_name: String,

    /// System role of the default agent.
    pub agent_role: String,

    /// Proxies the gateway should trust for forwarded headers.
    pub trusted_proxies: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Builtin,
            command: vec!["node".to_string(), "/root/clawd/configure.js".to_string()],
            output_path: PathBuf::from("/root/.openclaw/openclaw.json"),
            patch: false,
            model: "gemini-2.5-flash".to_string(),
            agent_name: "Moltbot".to_string(),
            agent_role: "You are a helpful AI assistant.".to_string(),
            trusted_proxies: vec!["10.1.0.0".to_string()],
        }
    }
}

/// Synthetic page rendering.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Name shown on the loading page.
    pub product_name: String,

    /// Auto-refresh interval of the loading page in seconds.
    pub refresh_secs: u32,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            product_name: "Moltbot".to_string(),
            refresh_secs: 2,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin listener.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,

    /// Bearer token required by admin routes; open when unset.
    pub api_key: Option<String>,

    /// How long `/admin/status` waits for the child port to accept TCP.
    pub readiness_timeout_ms: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:3002".to_string(),
            api_key: None,
            readiness_timeout_ms: 5000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log formatter.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
