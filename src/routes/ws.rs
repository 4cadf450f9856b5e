//! WebSocket upgrade + shell session loop.
//!
//! Each connection owns one `ShellState`. Generation runs in a spawned task and reports
//! back over a channel; a newer `generate` aborts the older task, and any reply that
//! still arrives for a superseded generation is dropped by `ShellState::complete`.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::domain::TeachingIdea;
use crate::error::IdeaError;
use crate::logic::generate_idea;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::shell::{Generation, ShellState};
use crate::state::AppState;

pub type Completion = (Generation, Result<TeachingIdea, IdeaError>);

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "muin_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Per-connection shell plus the handle of the request in flight, if any.
pub struct Session {
  id: String,
  shell: ShellState,
  tx: mpsc::Sender<Completion>,
  inflight: Option<JoinHandle<()>>,
}

impl Session {
  pub fn new(tx: mpsc::Sender<Completion>) -> Self {
    Self { id: Uuid::new_v4().to_string(), shell: ShellState::new(), tx, inflight: None }
  }

  fn state_message(&self) -> ServerWsMessage {
    ServerWsMessage::State { view: self.shell.view() }
  }

  /// Apply a finished generation; `None` when it was superseded.
  pub fn on_completion(&mut self, (generation, result): Completion) -> Option<ServerWsMessage> {
    if self.shell.complete(generation, result) {
      self.inflight = None;
      Some(self.state_message())
    } else {
      debug!(target: "muin_backend", session = %self.id, %generation, "Dropped stale generation");
      None
    }
  }
}

impl Drop for Session {
  fn drop(&mut self) {
    if let Some(h) = self.inflight.take() {
      h.abort();
    }
  }
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (tx, mut rx) = mpsc::channel::<Completion>(8);
  let mut session = Session::new(tx);
  info!(target: "muin_backend", session = %session.id, "WebSocket connected");

  if send(&mut socket, &session.state_message()).await.is_err() {
    return;
  }

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => {
            let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(m) => {
                debug!(target: "muin_backend", session = %session.id, "WS received: {:?}", &m);
                handle_client_ws(m, &state, &mut session)
              }
              Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
            };
            if send(&mut socket, &reply).await.is_err() {
              break;
            }
          }
          Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
          Message::Close(_) => break,
          _ => {}
        }
      }
      Some(done) = rx.recv() => {
        if let Some(reply) = session.on_completion(done) {
          if send(&mut socket, &reply).await.is_err() {
            break;
          }
        }
      }
    }
  }
  info!(target: "muin_backend", session = %session.id, "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "muin_backend", error = %e, "WS send error");
    e
  })
}

/// Apply one client message to the session and return the immediate reply.
pub fn handle_client_ws(msg: ClientWsMessage, state: &Arc<AppState>, session: &mut Session) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SelectCategory { category } => {
      session.shell.select_category(category);
      session.state_message()
    }

    ClientWsMessage::SelectLevel { level } => {
      session.shell.select_level(level);
      session.state_message()
    }

    ClientWsMessage::Generate => {
      if let Some(prev) = session.inflight.take() {
        prev.abort();
      }
      let generation = session.shell.begin_request();
      let (category, level) = session.shell.selection();
      let request_id = format!("{}#{}", session.id, generation);
      let state = Arc::clone(state);
      let tx = session.tx.clone();

      session.inflight = Some(tokio::spawn(async move {
        let result = generate_idea(&state, &request_id, category, level).await;
        let _ = tx.send((generation, result)).await;
      }));
      session.state_message()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builder::tests::{builder, envelope, ECHO_CHAIN};
  use crate::domain::Category;

  fn view(msg: &ServerWsMessage) -> &crate::shell::ShellView {
    match msg {
      ServerWsMessage::State { view } => view,
      other => panic!("expected state, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn generate_round_trip_through_session() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
      .mock("POST", "/models/test-model:generateContent")
      .with_body(envelope(ECHO_CHAIN))
      .create_async()
      .await;
    let state = Arc::new(AppState::new(builder(&server.url(), Some("k"))));
    let (tx, mut rx) = mpsc::channel(8);
    let mut session = Session::new(tx);

    let reply = handle_client_ws(ClientWsMessage::SelectCategory { category: Category::NewMemorization }, &state, &mut session);
    assert_eq!(view(&reply).category, Category::NewMemorization);

    let reply = handle_client_ws(ClientWsMessage::Generate, &state, &mut session);
    assert!(view(&reply).loading);

    let done = rx.recv().await.unwrap();
    let reply = session.on_completion(done).unwrap();
    let v = view(&reply);
    assert!(!v.loading);
    assert_eq!(v.idea.as_ref().unwrap().idea.title, "Echo Chain");
  }

  #[tokio::test]
  async fn superseded_generation_is_dropped() {
    let state = Arc::new(AppState::new(builder("http://127.0.0.1:9", None)));
    let (tx, mut rx) = mpsc::channel(8);
    let mut session = Session::new(tx);

    let stale = session.shell.begin_request();
    handle_client_ws(ClientWsMessage::Generate, &state, &mut session);

    assert!(session.on_completion((stale, Err(IdeaError::EmptyResponse))).is_none());

    let done = rx.recv().await.unwrap();
    let reply = session.on_completion(done).unwrap();
    let v = view(&reply);
    assert!(!v.loading);
    assert_eq!(v.error.as_ref().unwrap().kind, crate::error::ErrorKind::MissingCredential);
  }

  #[tokio::test]
  async fn stalled_upstream_still_clears_loading() {
    let gemini = crate::gemini::Gemini::new(
      Arc::new(crate::gemini::StaticCredential(Some("k".into()))),
      crate::gemini::tests::silent_upstream().await,
      "test-model",
      std::time::Duration::from_millis(300),
    )
    .unwrap();
    let builder = crate::builder::IdeaBuilder::new(gemini, crate::config::Prompts::default());
    let state = Arc::new(AppState::new(builder));
    let (tx, mut rx) = mpsc::channel(8);
    let mut session = Session::new(tx);

    let reply = handle_client_ws(ClientWsMessage::Generate, &state, &mut session);
    assert!(view(&reply).loading);

    let done = rx.recv().await.unwrap();
    let reply = session.on_completion(done).unwrap();
    let v = view(&reply);
    assert!(!v.loading);
    let err = v.error.as_ref().unwrap();
    assert_eq!(err.kind, crate::error::ErrorKind::TransportFailure);
    assert!(err.retryable);
  }

  #[test]
  fn ping_gets_pong() {
    let state = Arc::new(AppState::new(builder("http://127.0.0.1:9", None)));
    let (tx, _rx) = mpsc::channel(1);
    let mut session = Session::new(tx);
    assert!(matches!(handle_client_ws(ClientWsMessage::Ping, &state, &mut session), ServerWsMessage::Pong));
  }
}
