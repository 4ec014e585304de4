//! PhraseDrill · English phrase exercise generator backend
//!
//! - Axum HTTP + WebSocket API
//! - Gemini or SiliconFlow generation, credentials supplied per request
//! - Static form fallback (<static_dir>/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   DRILL_CONFIG_PATH  : path to TOML config (endpoints, timeouts, prompts, static dir)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use phrasedrill_backend::routes::build_router;
use phrasedrill_backend::state::AppState;
use phrasedrill_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (config + provider clients).
  let state = Arc::new(AppState::new()?);

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "phrasedrill", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "phrasedrill", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "phrasedrill", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
