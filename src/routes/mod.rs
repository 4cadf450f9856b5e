//! Router for the idea service: JSON API, the shell WebSocket, and the page itself.

use std::sync::Arc;

use axum::{
  routing::{get, post},
  Router,
};
use tower_http::{
  cors::{Any, CorsLayer},
  services::{ServeDir, ServeFile},
  set_status::SetStatus,
  trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

const DEFAULT_STATIC_DIR: &str = "./static";

/// `/api/v1/*` endpoints. Stateless: every idea request stands alone.
fn api_routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/health", get(http::http_health))
    .route("/categories", get(http::http_get_catalog))
    .route("/idea", post(http::http_post_idea))
}

/// Page assets from `STATIC_DIR` (default `./static`); unknown paths get `index.html`.
fn page_service() -> ServeDir<SetStatus<ServeFile>> {
  let dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.into());
  let index = format!("{}/index.html", dir.trim_end_matches('/'));
  ServeDir::new(&dir)
    .append_index_html_on_directories(true)
    .not_found_service(ServeFile::new(index))
}

pub fn build_router(state: Arc<AppState>) -> Router {
  // The page may be served from another origin during development.
  let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
  let trace = TraceLayer::new_for_http()
    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
    .on_response(DefaultOnResponse::new().level(Level::INFO));

  Router::new()
    .nest("/api/v1", api_routes())
    .route("/ws", get(ws::ws_upgrade))
    .with_state(state)
    .layer(cors)
    .layer(trace)
    .fallback_service(page_service())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
  };
  use tower::ServiceExt;

  use super::*;
  use crate::builder::tests::builder;

  #[tokio::test]
  async fn unknown_paths_serve_the_page() {
    let app = build_router(Arc::new(AppState::new(builder("http://127.0.0.1:9", None))));
    let res = app
      .oneshot(Request::get("/ideas/some-deep-link").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&html).contains("/api/v1/categories"));
  }

  #[tokio::test]
  async fn api_rejects_wrong_method() {
    let app = build_router(Arc::new(AppState::new(builder("http://127.0.0.1:9", None))));
    let res = app
      .oneshot(Request::get("/api/v1/idea").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
  }
}
