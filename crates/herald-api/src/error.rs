//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or malformed x-user-id header")]
  Unauthorized,

  #[error(transparent)]
  Core(#[from] herald_core::Error),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
  error: String,
  kind:  &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  field: Option<&'static str>,
}

impl ApiError {
  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    use herald_core::Error as E;
    match self {
      Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
      Self::Core(E::Validation { .. }) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
      Self::Core(E::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
      Self::Core(E::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "invalid_input"),
      Self::Core(E::Lookup(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "lookup"),
      Self::Core(E::Persistence(_) | E::Serialization(_)) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "persistence")
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    if status.is_server_error() {
      tracing::error!(error = %self, kind, "request failed");
    }

    let field = match &self {
      Self::Core(e) => e.field(),
      Self::Unauthorized => None,
    };
    let body = ErrorBody { error: self.to_string(), kind, field };
    (status, Json(body)).into_response()
  }
}
