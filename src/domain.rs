//! Domain models: categories, audience levels, and the validated teaching idea.

use serde::{Deserialize, Serialize};

use crate::error::IdeaError;

/// Upper bound on accepted steps. The prompt asks for 3 to 5.
pub const MAX_STEPS: usize = 8;

/// Pedagogical theme selected on the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  /// Catch-all: asks for varied ideas instead of a specific theme.
  #[default]
  All,
  NewMemorization,
  ReviewAndRetention,
  Motivation,
  ClassroomManagement,
  RecitationQuality,
}

impl Category {
  /// Display order of the category grid.
  pub const ALL: [Category; 6] = [
    Category::All,
    Category::NewMemorization,
    Category::ReviewAndRetention,
    Category::Motivation,
    Category::ClassroomManagement,
    Category::RecitationQuality,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Category::All => "أفكار منوعة",
      Category::NewMemorization => "طرق حفظ",
      Category::ReviewAndRetention => "مراجعة وتثبيت",
      Category::Motivation => "تحفيز وتشجيع",
      Category::ClassroomManagement => "ضبط الحلقة",
      Category::RecitationQuality => "تجويد وأداء",
    }
  }

  /// Phrase embedded in the prompt. `All` is its own branch, never a table miss.
  pub fn theme_phrase(self) -> &'static str {
    match self {
      Category::All => "varied ideas covering any aspect of teaching Quran memorization circles",
      Category::NewMemorization => "memorizing new Quran passages",
      Category::ReviewAndRetention => "reviewing and consolidating previously memorized passages",
      Category::Motivation => "motivating and encouraging students",
      Category::ClassroomManagement => "managing and keeping order in the Quran circle",
      Category::RecitationQuality => "improving recitation quality, tajweed rules and letter articulation",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Category::All => "all",
      Category::NewMemorization => "new_memorization",
      Category::ReviewAndRetention => "review_and_retention",
      Category::Motivation => "motivation",
      Category::ClassroomManagement => "classroom_management",
      Category::RecitationQuality => "recitation_quality",
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Who sits in the circle. Only changes prompt phrasing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceLevel {
  #[default]
  Children,
  Adults,
}

impl AudienceLevel {
  pub const ALL: [AudienceLevel; 2] = [AudienceLevel::Children, AudienceLevel::Adults];

  pub fn label(self) -> &'static str {
    match self {
      AudienceLevel::Children => "حلقات الأشبال",
      AudienceLevel::Adults => "حلقات الكبار",
    }
  }

  pub fn audience_phrase(self) -> &'static str {
    match self {
      AudienceLevel::Children => "children (roughly 6 to 12 years old) who need playful, short and concrete activities",
      AudienceLevel::Adults => "adult learners who prefer respectful, structured and self-directed activities",
    }
  }

  /// Short tag used in share text.
  pub fn share_tag(self) -> &'static str {
    match self {
      AudienceLevel::Children => "للصغار",
      AudienceLevel::Adults => "للكبار",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AudienceLevel::Children => "children",
      AudienceLevel::Adults => "adults",
    }
  }
}

impl std::fmt::Display for AudienceLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A generated teaching idea. Only built from a fully validated model reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingIdea {
  pub title: String,
  pub description: String,
  pub steps: Vec<String>,
  pub benefit: String,
  pub category: String,
  pub estimated_time: String,
}

/// Raw wire shape. Every field is required; serde rejects missing or mistyped ones.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdea {
  title: String,
  description: String,
  steps: Vec<String>,
  benefit: String,
  category: String,
  estimated_time: String,
}

impl TeachingIdea {
  /// Parse and validate the JSON text returned by the model.
  pub fn from_model_text(text: &str) -> Result<Self, IdeaError> {
    let raw: RawIdea = serde_json::from_str(text.trim())
      .map_err(|e| IdeaError::SchemaViolation(format!("invalid JSON payload: {e}")))?;

    let idea = TeachingIdea {
      title: required("title", raw.title)?,
      description: required("description", raw.description)?,
      steps: raw
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, s)| required(&format!("steps[{i}]"), s))
        .collect::<Result<Vec<_>, _>>()?,
      benefit: required("benefit", raw.benefit)?,
      category: required("category", raw.category)?,
      estimated_time: required("estimatedTime", raw.estimated_time)?,
    };

    if idea.steps.is_empty() || idea.steps.len() > MAX_STEPS {
      return Err(IdeaError::SchemaViolation(format!(
        "expected 1 to {MAX_STEPS} steps, got {}",
        idea.steps.len()
      )));
    }
    Ok(idea)
  }

  fn numbered_steps(&self) -> String {
    self
      .steps
      .iter()
      .enumerate()
      .map(|(i, s)| format!("{}- {}", i + 1, s))
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// Plain-text rendering used by the page's copy action.
  pub fn share_text(&self, level: AudienceLevel) -> String {
    let steps = self.numbered_steps();
    format!(
      "💡 فكرة تعليمية للحلقة ({}): *{}*\n\nالزمن: {}\n{}\n\n✅ الخطوات:\n{}\n\n🌟 الفائدة: {}",
      level.share_tag(),
      self.title,
      self.estimated_time,
      self.description,
      steps,
      self.benefit
    )
  }

  /// Shorter text for WhatsApp: title, description and steps only.
  pub fn whatsapp_text(&self) -> String {
    format!(
      "💡 فكرة للحلقة القرآنية: *{}*\n\n{}\n\n✅ الخطوات:\n{}",
      self.title,
      self.description,
      self.numbered_steps()
    )
  }

  /// WhatsApp share link carrying `whatsapp_text`.
  pub fn share_url(&self) -> String {
    let text = self.whatsapp_text();
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    format!("https://wa.me/?text={encoded}")
  }
}

fn required(field: &str, value: String) -> Result<String, IdeaError> {
  let v = value.trim();
  if v.is_empty() {
    return Err(IdeaError::SchemaViolation(format!("field '{field}' is empty")));
  }
  Ok(v.to_string())
}
