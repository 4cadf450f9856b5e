//! Muin · teaching-idea backend for Quran memorization teachers
//!
//! - Axum HTTP + WebSocket API
//! - Gemini structured generation (credential read from the environment per call)
//! - Static page fallback (STATIC_DIR, default ./static)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : Gemini key (API_KEY is accepted as a fallback)
//!   GEMINI_BASE_URL     : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL        : default "gemini-3-flash-preview"
//!   GEMINI_TIMEOUT_SECS : outbound call timeout (default 20)
//!   IDEAS_CONFIG_PATH   : path to TOML config (prompt templates, response language)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"
//!   STATIC_DIR          : directory holding index.html (default ./static)

mod builder;
mod config;
mod domain;
mod error;
mod gemini;
mod logic;
mod prompt;
mod protocol;
mod routes;
mod shell;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env()?);
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "muin_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "muin_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "muin_backend", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "muin_backend", "Shutdown signal received");
}
