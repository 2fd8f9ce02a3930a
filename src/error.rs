//! Top-level error returned from startup.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum WrapperError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
