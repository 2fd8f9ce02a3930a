//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection on the public port
//!     → server.rs (Axum router, request span with generated id)
//!     → supervisor state
//!         RUNNING  → hyper client → child loopback port → streamed back
//!         STARTING → pages.rs loading page (503)
//!         CRASHED  → pages.rs error page with log file (500)
//! ```

pub mod pages;
pub mod server;

pub use pages::Pages;
pub use server::HttpServer;
