//! Loading prompt configuration from TOML.
//!
//! See `IdeasConfig` and `Prompts` for the expected schema. Every field is optional;
//! missing ones fall back to the built-in defaults.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct IdeasConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts sent to Gemini. `user_template` understands `{theme}`, `{audience}` and `{language}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_instruction: String,
  pub user_template: String,
  /// Language the idea should be written in.
  pub language: String,
  pub temperature: f32,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_instruction: "You are an assistant dedicated to teachers of Quran memorization circles. \
        Your job is to offer inspiring, well-organized pedagogical ideas as strict JSON."
        .into(),
      user_template: "As an expert in teaching Quran memorization, suggest ONE creative and very practical \
        teaching technique for: \"{theme}\".\n\
        Audience: {audience}.\n\
        Constraints:\n\
        - It must be a classroom technique that can be applied immediately in a Quran circle, with little or no cost.\n\
        - Do NOT include devotional content, sermons, exegesis (tafsir) or religious rulings; focus only on teaching method.\n\
        - Give between 3 and 5 concrete steps and a short estimated duration (e.g. \"10 minutes\").\n\
        Write every field in {language}. Reply with JSON only, no prose around it."
        .into(),
      language: "Arabic".into(),
      temperature: 0.9,
    }
  }
}

/// Attempt to load `IdeasConfig` from IDEAS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_ideas_config_from_env() -> Option<IdeasConfig> {
  let path = std::env::var("IDEAS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<IdeasConfig>(&s) {
      Ok(cfg) => {
        info!(target: "muin_backend", %path, "Loaded ideas config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "muin_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "muin_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
