//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures become a typed JSON error body.

use std::sync::Arc;

use axum::{
  extract::State,
  response::{IntoResponse, Response},
  Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::IdeaError;
use crate::logic::{generate_idea, status_for};
use crate::protocol::*;
use crate::shell::{ErrorView, IdeaView};
use crate::state::AppState;

/// `IdeaError` rendered as `{ kind, message, retryable }` with a matching status.
pub struct ApiError(IdeaError);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (status_for(&self.0), Json(ErrorView::from(&self.0))).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, credential_configured: state.builder.gemini().has_credential() })
}

#[instrument(level = "info")]
pub async fn http_get_catalog() -> impl IntoResponse {
  Json(catalog())
}

#[instrument(level = "info", skip(state, body), fields(category = %body.category, level = %body.level))]
pub async fn http_post_idea(
  State(state): State<Arc<AppState>>,
  Json(body): Json<IdeaIn>,
) -> Result<Json<IdeaView>, ApiError> {
  let request_id = Uuid::new_v4().to_string();
  let idea = generate_idea(&state, &request_id, body.category, body.level)
    .await
    .map_err(ApiError)?;
  Ok(Json(IdeaView::new(idea, body.level)))
}
