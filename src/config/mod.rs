//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WrapperConfig (validated, immutable)
//!     → handed to the supervisor, servers and generators at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a wrapper restart
//! - All fields have defaults so the wrapper runs without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AdminConfig, BackoffPolicy, ChildConfig, GeneratorConfig, GeneratorMode, HealthConfig,
    ListenerConfig, LogConfig, LogFormat, ObservabilityConfig, PagesConfig, WrapperConfig,
};
