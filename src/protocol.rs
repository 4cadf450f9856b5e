//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and page independently.

use serde::{Deserialize, Serialize};

use crate::domain::{AudienceLevel, Category};
use crate::shell::ShellView;

/// Messages the page can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
  Ping,
  SelectCategory { category: Category },
  SelectLevel { level: AudienceLevel },
  Generate,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
  Pong,
  State { view: ShellView },
  Error { message: String },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct IdeaIn {
  #[serde(default)]
  pub category: Category,
  #[serde(default)]
  pub level: AudienceLevel,
}

#[derive(Debug, Serialize)]
pub struct ChoiceOut {
  pub id: &'static str,
  pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CatalogOut {
  pub categories: Vec<ChoiceOut>,
  pub levels: Vec<ChoiceOut>,
}

/// Static tables the page renders as its category grid and level toggle.
pub fn catalog() -> CatalogOut {
  CatalogOut {
    categories: Category::ALL.iter().map(|c| ChoiceOut { id: c.as_str(), label: c.label() }).collect(),
    levels: AudienceLevel::ALL.iter().map(|l| ChoiceOut { id: l.as_str(), label: l.label() }).collect(),
  }
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub credential_configured: bool,
}
