//! Failure taxonomy for one idea request.

use serde::Serialize;
use thiserror::Error;

/// Everything that can go wrong while requesting an idea.
/// Scoped to a single request; nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum IdeaError {
  /// No API key in the environment. Raised before any network call.
  #[error("Gemini API key is not configured (set GEMINI_API_KEY or API_KEY)")]
  MissingCredential,

  #[error("Gemini call failed: {0}")]
  TransportFailure(#[from] TransportError),

  /// HTTP success, but the model produced no text.
  #[error("Gemini returned an empty response")]
  EmptyResponse,

  /// The text did not parse into a complete teaching idea.
  #[error("Gemini response violated the idea schema: {0}")]
  SchemaViolation(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,

  #[error("connection failed: {0}")]
  Connect(String),

  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("unreadable response envelope: {0}")]
  Decode(String),
}

impl TransportError {
  /// True when the provider refused the key rather than the network failing.
  pub fn is_credential_rejected(&self) -> bool {
    match self {
      TransportError::Status { status: 401 | 403, .. } => true,
      TransportError::Status { status: 400, message } => {
        let m = message.to_ascii_lowercase();
        m.contains("api key") || m.contains("api_key")
      }
      _ => false,
    }
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      TransportError::Timeout
    } else if e.is_decode() {
      TransportError::Decode(e.to_string())
    } else {
      TransportError::Connect(e.to_string())
    }
  }
}

/// Stable tag exposed to the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  MissingCredential,
  TransportFailure,
  EmptyResponse,
  SchemaViolation,
}

impl IdeaError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      IdeaError::MissingCredential => ErrorKind::MissingCredential,
      IdeaError::TransportFailure(_) => ErrorKind::TransportFailure,
      IdeaError::EmptyResponse => ErrorKind::EmptyResponse,
      IdeaError::SchemaViolation(_) => ErrorKind::SchemaViolation,
    }
  }

  /// Whether pressing "generate" again can help without fixing configuration.
  pub fn is_retryable(&self) -> bool {
    match self {
      IdeaError::MissingCredential => false,
      IdeaError::TransportFailure(t) => !t.is_credential_rejected(),
      IdeaError::EmptyResponse | IdeaError::SchemaViolation(_) => true,
    }
  }
}
