//! Minimal Gemini client for structured JSON generation.
//!
//! We only call `models/{model}:generateContent` with a declared `responseSchema`.
//! Calls are instrumented and log model names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key. It is read from the credential source on every call.

use std::{sync::Arc, time::Duration};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{IdeaError, TransportError};
use crate::util::trunc_for_log;

const X_GOOG_API_KEY: &str = "x-goog-api-key";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Where the API key comes from. Read at call time, never cached by the client.
pub trait CredentialSource: Send + Sync {
  fn api_key(&self) -> Option<String>;
}

/// Reads the first non-empty variable among `vars`.
pub struct EnvCredential {
  vars: Vec<&'static str>,
}

impl EnvCredential {
  pub fn new(vars: Vec<&'static str>) -> Self {
    Self { vars }
  }
}

impl Default for EnvCredential {
  fn default() -> Self {
    Self::new(vec!["GEMINI_API_KEY", "API_KEY"])
  }
}

impl CredentialSource for EnvCredential {
  fn api_key(&self) -> Option<String> {
    self
      .vars
      .iter()
      .filter_map(|v| std::env::var(v).ok())
      .map(|k| k.trim().to_string())
      .find(|k| !k.is_empty())
  }
}

/// Fixed key for tests.
#[cfg(test)]
pub struct StaticCredential(pub Option<String>);

#[cfg(test)]
impl CredentialSource for StaticCredential {
  fn api_key(&self) -> Option<String> {
    self.0.clone().filter(|k| !k.trim().is_empty())
  }
}

#[derive(Clone)]
pub struct Gemini {
  client: reqwest::Client,
  credentials: Arc<dyn CredentialSource>,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl std::fmt::Debug for Gemini {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Gemini")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("timeout", &self.timeout)
      .field("api_key", &"[REDACTED]")
      .finish()
  }
}

impl Gemini {
  pub fn new(
    credentials: Arc<dyn CredentialSource>,
    base_url: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, IdeaError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Connect(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      credentials,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
      timeout,
    })
  }

  /// Settings from GEMINI_BASE_URL, GEMINI_MODEL, GEMINI_TIMEOUT_SECS; key from GEMINI_API_KEY or API_KEY.
  pub fn from_env() -> Result<Self, IdeaError> {
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .filter(|s| *s > 0)
      .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Self::new(
      Arc::new(EnvCredential::default()),
      base_url,
      model,
      Duration::from_secs(timeout_secs),
    )
  }

  pub fn has_credential(&self) -> bool {
    self.credentials.api_key().is_some()
  }

  /// Structured generation. Returns the raw JSON text of the first candidate.
  #[instrument(level = "info", skip(self, system, user, schema), fields(model = %self.model, prompt_len = user.len()))]
  pub async fn generate_json(
    &self,
    system: &str,
    user: &str,
    schema: Value,
    temperature: f32,
  ) -> Result<String, IdeaError> {
    let api_key = self.credentials.api_key().ok_or(IdeaError::MissingCredential)?;

    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      system_instruction: Content { role: None, parts: vec![Part { text: system.into() }] },
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: user.into() }] }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: schema,
        temperature,
      },
    };

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "muin-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(X_GOOG_API_KEY, api_key)
      .json(&req)
      .send()
      .await
      .map_err(TransportError::from)?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_else(|e| {
        debug!(status = status.as_u16(), error = %e, "Failed to read Gemini error body");
        String::new()
      });
      let message = extract_gemini_error(&body).unwrap_or(body);
      warn!(status = status.as_u16(), elapsed = ?start.elapsed(), error = %trunc_for_log(&message, 200), "Gemini HTTP error");
      return Err(TransportError::Status { status: status.as_u16(), message }.into());
    }

    let body: GenerateContentResponse = res.json().await.map_err(TransportError::from)?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let candidate = body.candidates.into_iter().next();
    let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());
    let text: String = candidate
      .and_then(|c| c.content)
      .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
      .unwrap_or_default();

    info!(elapsed = ?start.elapsed(), text_len = text.len(), finish_reason = ?finish_reason, "Gemini response received");
    if text.trim().is_empty() {
      return Err(IdeaError::EmptyResponse);
    }
    debug!(preview = %trunc_for_log(&text, 120), "Gemini text");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  system_instruction: Content,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  parts: Vec<Part>,
}
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
  temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)] parts: Vec<CandidatePart>,
}
#[derive(Deserialize)]
struct CandidatePart {
  #[serde(default)] text: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use mockito::Matcher;
  use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
  };

  /// Accepts connections and never answers. Returns its base URL.
  pub(crate) async fn silent_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let mut held = Vec::new();
      while let Ok((sock, _)) = listener.accept().await {
        held.push(sock);
      }
    });
    format!("http://{addr}")
  }

  const PATH: &str = "/models/test-model:generateContent";

  fn client(url: &str, key: Option<&str>) -> Gemini {
    Gemini::new(
      Arc::new(StaticCredential(key.map(str::to_string))),
      url,
      "test-model",
      Duration::from_secs(2),
    )
    .unwrap()
  }

  fn envelope(text: &str) -> String {
    serde_json::json!({
      "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" }, "finishReason": "STOP" }],
      "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 20, "totalTokenCount": 30 }
    })
    .to_string()
  }

  #[tokio::test]
  async fn sends_key_schema_and_returns_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", PATH)
      .match_header("x-goog-api-key", "secret")
      .match_body(Matcher::PartialJson(serde_json::json!({
        "generationConfig": { "responseMimeType": "application/json" },
        "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(envelope("{\"a\":1}"))
      .create_async()
      .await;

    let text = client(&server.url(), Some("secret"))
      .generate_json("sys", "hello", serde_json::json!({"type": "OBJECT"}), 0.5)
      .await
      .unwrap();
    assert_eq!(text, "{\"a\":1}");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn missing_key_never_touches_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", PATH).expect(0).create_async().await;

    let err = client(&server.url(), None)
      .generate_json("sys", "hello", Value::Null, 0.5)
      .await
      .unwrap_err();
    assert!(matches!(err, IdeaError::MissingCredential));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn blank_candidate_text_is_empty_response() {
    let mut server = mockito::Server::new_async().await;
    let _m = server.mock("POST", PATH).with_status(200).with_body(envelope("   ")).create_async().await;
    let err = client(&server.url(), Some("k")).generate_json("s", "u", Value::Null, 0.5).await.unwrap_err();
    assert!(matches!(err, IdeaError::EmptyResponse));
  }

  #[tokio::test]
  async fn no_candidates_is_empty_response() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
      .mock("POST", PATH)
      .with_status(200)
      .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
      .create_async()
      .await;
    let err = client(&server.url(), Some("k")).generate_json("s", "u", Value::Null, 0.5).await.unwrap_err();
    assert!(matches!(err, IdeaError::EmptyResponse));
  }

  #[tokio::test]
  async fn http_error_carries_status_and_provider_message() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
      .mock("POST", PATH)
      .with_status(400)
      .with_body(r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#)
      .create_async()
      .await;
    let err = client(&server.url(), Some("bad")).generate_json("s", "u", Value::Null, 0.5).await.unwrap_err();
    match err {
      IdeaError::TransportFailure(t) => {
        assert!(t.is_credential_rejected());
        assert!(matches!(t, TransportError::Status { status: 400, .. }));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn unreachable_host_is_transport_failure() {
    let err = client("http://127.0.0.1:9", Some("k")).generate_json("s", "u", Value::Null, 0.5).await.unwrap_err();
    match err {
      IdeaError::TransportFailure(t) => assert!(!t.is_credential_rejected()),
      other => panic!("unexpected {other:?}"),
    }
  }

  #[tokio::test]
  async fn stalled_upstream_times_out() {
    let url = silent_upstream().await;
    let g = Gemini::new(
      Arc::new(StaticCredential(Some("k".into()))),
      url,
      "test-model",
      Duration::from_millis(300),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let err = g.generate_json("s", "u", Value::Null, 0.5).await.unwrap_err();
    assert!(
      matches!(err, IdeaError::TransportFailure(TransportError::Timeout)),
      "got {err:?}"
    );
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(5));
  }

  #[tokio::test]
  async fn truncated_error_body_keeps_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut sock, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 4096];
      let _ = sock.read(&mut buf).await;
      let _ = sock
        .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
        .await;
      let _ = sock.shutdown().await;
    });

    let err = client(&format!("http://{addr}"), Some("k"))
      .generate_json("s", "u", Value::Null, 0.5)
      .await
      .unwrap_err();
    match err {
      IdeaError::TransportFailure(TransportError::Status { status, message }) => {
        assert_eq!(status, 500);
        assert!(message.is_empty(), "unexpected message {message:?}");
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn debug_redacts_key() {
    let g = client("http://localhost", Some("super-secret"));
    let dbg = format!("{g:?}");
    assert!(dbg.contains("[REDACTED]"));
    assert!(!dbg.contains("super-secret"));
  }
}
