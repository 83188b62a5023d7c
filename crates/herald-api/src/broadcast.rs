//! Handlers for `/broadcast` endpoints: one template, many recipients.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  directory::UserDirectory, fanout::NotificationTemplate, store::NotificationStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
  pub recipients: Vec<Uuid>,
  pub template:   NotificationTemplate,
}

/// `POST /broadcast`. Returns 201 and the created records.
pub async fn to_users<S, D>(
  State(state): State<AppState<S, D>>,
  caller: Caller,
  Json(body): Json<BroadcastBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let mut template = body.template;
  template.sender = caller.sender(template.sender)?;
  let created = state.fanout().notify_many(body.recipients, template).await?;
  tracing::info!(count = created.len(), "broadcast sent");
  Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /broadcast/role/{role}` with the template as body.
pub async fn to_role<S, D>(
  State(state): State<AppState<S, D>>,
  caller: Caller,
  Path(role): Path<String>,
  Json(mut template): Json<NotificationTemplate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  template.sender = caller.sender(template.sender)?;
  let created = state.fanout().notify_by_role(&role, template).await?;
  tracing::info!(%role, count = created.len(), "role broadcast sent");
  Ok((StatusCode::CREATED, Json(created)))
}
