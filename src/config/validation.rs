//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and cross-field
//! constraints. All errors are collected rather than stopping at the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GeneratorMode, WrapperConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WrapperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.child.command.trim().is_empty() {
        errors.push(ValidationError::new("child.command", "must not be empty"));
    }
    if config.child.port == 0 {
        errors.push(ValidationError::new("child.port", "must be non-zero"));
    }
    if config.child.port_env.trim().is_empty() {
        errors.push(ValidationError::new("child.port_env", "must not be empty"));
    }
    if let Ok(addr) = config.listener.bind_address.parse::<SocketAddr>() {
        // The child binds loopback, so only a loopback or wildcard listener collides.
        if addr.port() == config.child.port && (addr.ip().is_loopback() || addr.ip().is_unspecified()) {
            errors.push(ValidationError::new(
                "child.port",
                "must differ from the listener port",
            ));
        }
    }

    if config.health.interval_ms == 0 {
        errors.push(ValidationError::new("health.interval_ms", "must be non-zero"));
    }
    if config.health.timeout_ms == 0 {
        errors.push(ValidationError::new("health.timeout_ms", "must be non-zero"));
    }
    if config.health.max_delay_ms < config.health.interval_ms {
        errors.push(ValidationError::new(
            "health.max_delay_ms",
            "must be at least health.interval_ms",
        ));
    }
    if !config.health.path.starts_with('/') {
        errors.push(ValidationError::new("health.path", "must start with '/'"));
    }

    if config.generator.mode == GeneratorMode::Command
        && config.generator.command.iter().all(|part| part.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "generator.command",
            "command mode requires a program",
        ));
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("'{}' is not a socket address", config.admin.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
