//! Error types for `herald-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A field is missing, too long, malformed, or outside its closed set.
  /// Raised before anything is written.
  #[error("invalid {field}: {reason}")]
  Validation {
    field:  &'static str,
    reason: String,
  },

  /// The record does not exist, is soft-deleted, or belongs to someone else.
  #[error("notification not found: {0}")]
  NotFound(Uuid),

  /// Caller-supplied query parameters are unusable (empty search text,
  /// non-positive page or limit).
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("persistence error: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// An external collaborator (user directory, entity lookup) failed.
  #[error("lookup error: {0}")]
  Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }

  /// The offending field, for errors that have one.
  pub fn field(&self) -> Option<&'static str> {
    match self {
      Self::Validation { field, .. } => Some(field),
      _ => None,
    }
  }
}

impl From<std::convert::Infallible> for Error {
  fn from(e: std::convert::Infallible) -> Self { match e {} }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
