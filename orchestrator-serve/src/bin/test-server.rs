//! Standalone binary used by the e2e tests under `tests/e2e/`: binds to an
//! ephemeral port on loopback and prints the chosen port on stdout so the test
//! harness can connect, rather than hardcoding a port.

use std::net::SocketAddr;

use orchestrator_serve::{build_state, run_serve_on_listener, ServeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::try_init().ok();

    let config = ServeConfig::from_env();
    let state = build_state(config).await?;

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("listening on {}", listener.local_addr()?);

    run_serve_on_listener(state, listener).await
}
