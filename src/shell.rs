//! Presentation shell state: selection, loading flag, last idea or error.
//!
//! Each request gets a generation number; only the latest one may write results,
//! so a slow reply to a superseded request can never overwrite a newer one.

use serde::Serialize;

use crate::domain::{AudienceLevel, Category, TeachingIdea};
use crate::error::{ErrorKind, IdeaError};

/// Token tagging one generate action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl std::fmt::Display for Generation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Default)]
pub struct ShellState {
  category: Category,
  level: AudienceLevel,
  loading: bool,
  idea: Option<IdeaView>,
  error: Option<ErrorView>,
  latest: u64,
  /// Level captured when the pending request started; share text uses it.
  requested_level: AudienceLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorView {
  pub kind: ErrorKind,
  pub message: String,
  pub retryable: bool,
}

impl From<&IdeaError> for ErrorView {
  fn from(e: &IdeaError) -> Self {
    Self { kind: e.kind(), message: user_message(e).to_string(), retryable: e.is_retryable() }
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaView {
  #[serde(flatten)]
  pub idea: TeachingIdea,
  pub share_text: String,
  pub share_url: String,
}

impl IdeaView {
  pub fn new(idea: TeachingIdea, level: AudienceLevel) -> Self {
    Self { share_text: idea.share_text(level), share_url: idea.share_url(), idea }
  }
}

/// Snapshot sent to the page after every change.
#[derive(Clone, Debug, Serialize)]
pub struct ShellView {
  pub category: Category,
  pub level: AudienceLevel,
  pub loading: bool,
  pub idea: Option<IdeaView>,
  pub error: Option<ErrorView>,
}

impl ShellState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn select_category(&mut self, category: Category) {
    self.category = category;
  }

  pub fn select_level(&mut self, level: AudienceLevel) {
    self.level = level;
  }

  pub fn selection(&self) -> (Category, AudienceLevel) {
    (self.category, self.level)
  }

  /// Start a request: previous idea and error are cleared, loading is set.
  pub fn begin_request(&mut self) -> Generation {
    self.latest += 1;
    self.requested_level = self.level;
    self.loading = true;
    self.idea = None;
    self.error = None;
    Generation(self.latest)
  }

  /// Apply a finished request. Returns false (and changes nothing) when it was superseded.
  pub fn complete(&mut self, generation: Generation, result: Result<TeachingIdea, IdeaError>) -> bool {
    if generation.0 != self.latest {
      return false;
    }
    self.loading = false;
    match result {
      Ok(idea) => {
        self.idea = Some(IdeaView::new(idea, self.requested_level));
        self.error = None;
      }
      Err(e) => {
        self.idea = None;
        self.error = Some(ErrorView::from(&e));
      }
    }
    true
  }

  pub fn view(&self) -> ShellView {
    ShellView {
      category: self.category,
      level: self.level,
      loading: self.loading,
      idea: self.idea.clone(),
      error: self.error.clone(),
    }
  }
}

/// User-facing text per failure. Setup problems never share text with network problems.
pub fn user_message(e: &IdeaError) -> &'static str {
  match e {
    IdeaError::MissingCredential => "لم يتم إعداد مفتاح API للخدمة. يرجى ضبط GEMINI_API_KEY ثم إعادة المحاولة.",
    IdeaError::TransportFailure(t) if t.is_credential_rejected() => {
      "تم رفض مفتاح API. تأكد من صحة المفتاح وصلاحياته."
    }
    IdeaError::TransportFailure(_) => "تعذر الاتصال بالمعلم الذكي. تحقق من اتصالك بالشبكة وحاول مرة أخرى.",
    IdeaError::EmptyResponse => "لم يتم استلام رد من الذكاء الاصطناعي. يرجى المحاولة مرة أخرى.",
    IdeaError::SchemaViolation(_) => "وصل رد غير مكتمل من الذكاء الاصطناعي. يرجى المحاولة مرة أخرى.",
  }
}
