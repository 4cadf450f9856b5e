//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Requesting an idea and logging its outcome under a request id
//!   - Mapping failures to HTTP statuses for the stateless endpoint

use axum::http::StatusCode;
use tracing::{error, info, instrument, warn};

use crate::domain::{AudienceLevel, Category, TeachingIdea};
use crate::error::IdeaError;
use crate::state::AppState;

#[instrument(level = "info", skip(state), fields(%request_id, %category, %level))]
pub async fn generate_idea(
  state: &AppState,
  request_id: &str,
  category: Category,
  level: AudienceLevel,
) -> Result<TeachingIdea, IdeaError> {
  let start = std::time::Instant::now();
  let result = state.builder.request_idea(category, level).await;
  let elapsed = start.elapsed();

  match &result {
    Ok(idea) => info!(target: "idea", ?elapsed, title = %idea.title, "Idea served"),
    Err(e) if matches!(e, IdeaError::MissingCredential) => error!(target: "idea", ?elapsed, error = %e, "Idea request needs setup"),
    Err(e) => warn!(target: "idea", ?elapsed, kind = ?e.kind(), retryable = e.is_retryable(), error = %e, "Idea request failed"),
  }
  result
}

/// Setup problems are 503 (service not configured); upstream problems are 502.
pub fn status_for(e: &IdeaError) -> StatusCode {
  match e {
    IdeaError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
    IdeaError::TransportFailure(crate::error::TransportError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
    IdeaError::TransportFailure(_) | IdeaError::EmptyResponse | IdeaError::SchemaViolation(_) => {
      StatusCode::BAD_GATEWAY
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::TransportError;

  #[test]
  fn statuses_separate_setup_from_upstream() {
    assert_eq!(status_for(&IdeaError::MissingCredential), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_for(&IdeaError::EmptyResponse), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(&IdeaError::SchemaViolation("x".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(&TransportError::Timeout.into()), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
      status_for(&TransportError::Connect("refused".into()).into()),
      StatusCode::BAD_GATEWAY
    );
  }
}
