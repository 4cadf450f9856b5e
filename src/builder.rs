//! Idea request builder: (category, level) -> prompt -> Gemini -> validated `TeachingIdea`.
//!
//! Stateless between calls. No retries or caching; every failure surfaces as an `IdeaError`.

use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{AudienceLevel, Category, TeachingIdea};
use crate::error::IdeaError;
use crate::gemini::Gemini;
use crate::prompt::{compose_prompt, response_schema};

#[derive(Clone, Debug)]
pub struct IdeaBuilder {
  gemini: Gemini,
  prompts: Prompts,
}

impl IdeaBuilder {
  pub fn new(gemini: Gemini, prompts: Prompts) -> Self {
    Self { gemini, prompts }
  }

  pub fn gemini(&self) -> &Gemini {
    &self.gemini
  }

  #[instrument(level = "info", skip(self), fields(%category, %level))]
  pub async fn request_idea(&self, category: Category, level: AudienceLevel) -> Result<TeachingIdea, IdeaError> {
    let user = compose_prompt(&self.prompts, category, level);
    let text = self
      .gemini
      .generate_json(&self.prompts.system_instruction, &user, response_schema(), self.prompts.temperature)
      .await?;

    match TeachingIdea::from_model_text(&text) {
      Ok(idea) => {
        info!(target: "idea", title = %idea.title, steps = idea.steps.len(), "Teaching idea generated");
        Ok(idea)
      }
      Err(e) => {
        warn!(target: "idea", error = %e, "Model reply rejected");
        Err(e)
      }
    }
  }
}
