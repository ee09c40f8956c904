//! Submission checks run before anything is sent to the store.
//!
//! Text is not trimmed: a whitespace-only fact counts as non-empty, and its
//! length is the number of `char`s, the same count `remaining_chars` reports.

use crate::category::Category;
use crate::fact::NewFact;
use thiserror::Error;
use url::Url;

/// Longest fact text accepted, in characters.
pub const MAX_TEXT_CHARS: usize = 200;

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("fact text is empty")]
    EmptyText,

    #[error("fact text is {len} characters, the limit is {MAX_TEXT_CHARS}")]
    TextTooLong { len: usize },

    #[error("source is not a valid URL: {0}")]
    InvalidSource(String),

    #[error("source must be an http or https URL, got scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("no category chosen")]
    MissingCategory,

    #[error("unknown category: {0:?}")]
    UnknownCategory(String),
}

impl ValidationError {
    /// The form field this error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyText | ValidationError::TextTooLong { .. } => "text",
            ValidationError::InvalidSource(_) | ValidationError::UnsupportedScheme(_) => "source",
            ValidationError::MissingCategory | ValidationError::UnknownCategory(_) => "category",
        }
    }
}

/// Characters left before `text` hits the limit. Negative once over it.
pub fn remaining_chars(text: &str) -> i64 {
    MAX_TEXT_CHARS as i64 - text.chars().count() as i64
}

/// Whether `(text, source, category)` would be accepted for submission.
pub fn is_submittable(text: &str, source: &str, category: &str) -> bool {
    validate(text, source, category).is_ok()
}

/// Check a submission field by field, returning the typed insert payload.
pub fn validate(text: &str, source: &str, category: &str) -> Result<NewFact, ValidationError> {
    check_text(text)?;
    check_source(source)?;
    let category = check_category(category)?;

    Ok(NewFact {
        text: text.to_string(),
        source: source.to_string(),
        category,
    })
}

fn check_text(text: &str) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if len == 0 {
        return Err(ValidationError::EmptyText);
    }
    if len > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong { len });
    }
    Ok(())
}

fn check_source(source: &str) -> Result<(), ValidationError> {
    let url = Url::parse(source).map_err(|e| ValidationError::InvalidSource(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::UnsupportedScheme(other.to_string())),
    }
}

fn check_category(category: &str) -> Result<Category, ValidationError> {
    if category.is_empty() {
        return Err(ValidationError::MissingCategory);
    }
    category
        .parse()
        .map_err(|_| ValidationError::UnknownCategory(category.to_string()))
}
