//! Application state shared by all handlers: prompts and the idea builder.
//!
//! Nothing here is mutable. Per-connection shell state lives in the WebSocket task.

use tracing::{info, instrument, warn};

use crate::builder::IdeaBuilder;
use crate::config::load_ideas_config_from_env;
use crate::error::IdeaError;
use crate::gemini::Gemini;

#[derive(Clone, Debug)]
pub struct AppState {
  pub builder: IdeaBuilder,
}

impl AppState {
  /// Build state from env: load prompt config, init the Gemini client.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, IdeaError> {
    let prompts = load_ideas_config_from_env().map(|c| c.prompts).unwrap_or_default();
    let gemini = Gemini::from_env()?;

    if gemini.has_credential() {
      info!(target: "muin_backend", base_url = %gemini.base_url, model = %gemini.model, timeout = ?gemini.timeout, language = %prompts.language, "Gemini configured.");
    } else {
      warn!(target: "muin_backend", base_url = %gemini.base_url, model = %gemini.model, "No GEMINI_API_KEY/API_KEY set; idea requests will report a missing credential.");
    }

    Ok(Self::new(IdeaBuilder::new(gemini, prompts)))
  }

  pub fn new(builder: IdeaBuilder) -> Self {
    Self { builder }
  }
}
