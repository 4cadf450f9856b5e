//! Prompt composition and the declared output schema for idea generation.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{AudienceLevel, Category};
use crate::util::fill_template;

/// Build the user prompt for one request. Inputs are closed enums, so no user text reaches it.
pub fn compose_prompt(prompts: &Prompts, category: Category, level: AudienceLevel) -> String {
  fill_template(
    &prompts.user_template,
    &[
      ("theme", category.theme_phrase()),
      ("audience", level.audience_phrase()),
      ("language", &prompts.language),
    ],
  )
}

/// Gemini `responseSchema` matching `TeachingIdea`. All fields required.
pub fn response_schema() -> Value {
  json!({
    "type": "OBJECT",
    "properties": {
      "title": { "type": "STRING", "description": "Name of the teaching technique" },
      "description": { "type": "STRING", "description": "Short, engaging explanation" },
      "steps": {
        "type": "ARRAY",
        "items": { "type": "STRING" },
        "description": "Implementation steps (between 3 and 5)"
      },
      "benefit": { "type": "STRING", "description": "Expected educational benefit" },
      "category": { "type": "STRING", "description": "Category of the idea" },
      "estimatedTime": { "type": "STRING", "description": "Estimated duration, e.g. 10 minutes" }
    },
    "required": ["title", "description", "steps", "benefit", "category", "estimatedTime"],
    "propertyOrdering": ["title", "description", "steps", "benefit", "category", "estimatedTime"]
  })
}
