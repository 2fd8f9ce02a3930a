//! Stand-in gateway for trying the wrapper locally.
//!
//! ```text
//! [child]
//! command = "target/debug/examples/fake_gateway"
//! ```
//!
//! Binds `$PORT`, waits `FAKE_GATEWAY_DELAY_SECS` first, and exits with
//! code 1 after `FAKE_GATEWAY_CRASH_SECS` when set.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};

fn env_secs(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(3001);

    println!("fake gateway booting");
    if let Some(delay) = env_secs("FAKE_GATEWAY_DELAY_SECS") {
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }

    if let Some(after) = env_secs("FAKE_GATEWAY_CRASH_SECS") {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(after)).await;
            eprintln!("fake gateway: simulated fatal error");
            std::process::exit(1);
        });
    }

    let app = Router::new()
        .route("/", get(|| async { "Hello from the fake gateway" }))
        .route("/api/status", get(|| async { r#"{"ok":true}"# }));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("fake gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
