//! OpenClaw gateway wrapper library.

pub mod admin;
pub mod config;
pub mod error;
pub mod gateway_config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod process;
pub mod resilience;
pub mod supervisor;

pub use config::WrapperConfig;
pub use error::WrapperError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use supervisor::{Supervisor, SupervisorState};
