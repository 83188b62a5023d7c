//! Caller identity.
//!
//! Authentication happens upstream; by the time a request reaches this API
//! the gateway has put the authenticated user's id in `x-user-id`.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Uuid);

impl Caller {
  /// The sender to store for a write by this caller. A body may name the
  /// caller explicitly but never anyone else.
  pub fn sender(self, supplied: Option<Uuid>) -> Result<Option<Uuid>, ApiError> {
    match supplied {
      Some(id) if id != self.0 => Err(ApiError::Core(herald_core::Error::validation(
        "sender",
        "sender must be the authenticated caller",
      ))),
      _ => Ok(Some(self.0)),
    }
  }
}

/// Read the caller from headers; missing, non-UTF-8, unparsable or nil ids
/// are all rejected.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
  let id = headers
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
    .ok_or(ApiError::Unauthorized)?;
  if id.is_nil() {
    return Err(ApiError::Unauthorized);
  }
  Ok(Caller(id))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    caller_from_headers(&parts.headers)
  }
}
