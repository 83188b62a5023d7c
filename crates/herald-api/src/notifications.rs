//! Handlers for `/notifications` endpoints. Every endpoint acts on the
//! caller's own notifications.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/notifications` | Filters: `type`, `category`, `priority`, `is_read`; `sort_by`, `sort_order`, `page`, `limit` |
//! | `POST`   | `/notifications` | Body: [`NewNotification`]; returns 201 |
//! | `DELETE` | `/notifications` | Body: `{"ids": [...]}`; returns `{"deleted": n}` |
//! | `GET`    | `/notifications/unread-count` | `{"count": n}` |
//! | `GET`    | `/notifications/stats` | Totals by type and priority |
//! | `GET`    | `/notifications/search` | `?q=` required |
//! | `GET`    | `/notifications/category/{category}` | Paginated |
//! | `PUT`    | `/notifications/read-all` | `{"updated": n}` |
//! | `GET`    | `/notifications/{id}` | With sender and related entity |
//! | `PATCH`  | `/notifications/{id}` | Body: [`NotificationPatch`] |
//! | `PUT`    | `/notifications/{id}/read` | Idempotent |
//! | `PUT`    | `/notifications/{id}/unread` | |
//! | `DELETE` | `/notifications/{id}` | 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use herald_core::{
  Error,
  directory::UserDirectory,
  notification::{
    Category, EntityResolver, NewNotification, Notification, NotificationPatch,
    NotificationType, Priority,
  },
  query::{ListParams, NotificationDetail, NotificationStats, NotificationView, Page},
  store::{DEFAULT_PAGE_LIMIT, NotificationStore, PageRequest, SortField, SortOrder},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, Caller, error::ApiError};

// ─── Query strings ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub page:  Option<i64>,
  pub limit: Option<i64>,
}

impl PageQuery {
  fn request(&self) -> Result<PageRequest, Error> {
    PageRequest::new(
      self.page.unwrap_or(1),
      self.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT)),
    )
  }
}

/// Query string for `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
  #[serde(rename = "type")]
  pub notification_type: Option<NotificationType>,
  pub category:          Option<Category>,
  pub priority:          Option<Priority>,
  pub is_read:           Option<bool>,
  #[serde(default)]
  pub sort_by:           SortField,
  #[serde(default)]
  pub sort_order:        SortOrder,
  pub page:              Option<i64>,
  pub limit:             Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
  #[serde(default)]
  pub q:     String,
  pub page:  Option<i64>,
  pub limit: Option<i64>,
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// `GET /notifications`
pub async fn list<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Query(q): Query<ListQuery>,
) -> Result<Json<Page<NotificationView>>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let page = PageQuery { page: q.page, limit: q.limit }.request()?;
  let params = ListParams {
    notification_type: q.notification_type,
    category:          q.category,
    priority:          q.priority,
    is_read:           q.is_read,
    sort_by:           q.sort_by,
    sort_order:        q.sort_order,
  };
  Ok(Json(state.query().list(caller, params, page).await?))
}

/// `GET /notifications/category/{category}`
pub async fn by_category<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(category): Path<Category>,
  Query(q): Query<PageQuery>,
) -> Result<Json<Page<NotificationView>>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  Ok(Json(state.query().by_category(caller, category, q.request()?).await?))
}

/// `GET /notifications/search?q=...`
pub async fn search<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Query(q): Query<SearchQuery>,
) -> Result<Json<Page<NotificationView>>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let page = PageQuery { page: q.page, limit: q.limit }.request()?;
  Ok(Json(state.query().search(caller, &q.q, page).await?))
}

/// `GET /notifications/unread-count`
pub async fn unread_count<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
) -> Result<Json<Value>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let count = state.query().unread_count(caller).await?;
  Ok(Json(json!({ "count": count })))
}

/// `GET /notifications/stats`
pub async fn stats<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
) -> Result<Json<NotificationStats>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  Ok(Json(state.query().stats(caller).await?))
}

/// `GET /notifications/{id}`
pub async fn get_one<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<NotificationDetail>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory + EntityResolver,
{
  let resolver = state.directory.clone();
  Ok(Json(state.query().detail(caller, id, resolver.as_ref()).await?))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// `POST /notifications`. The caller is always the sender.
pub async fn create<S, D>(
  State(state): State<AppState<S, D>>,
  caller: Caller,
  Json(mut body): Json<NewNotification>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  body.sender = caller.sender(body.sender)?;
  let mut created = state.events().notify(body).await?;
  let notification = created.pop().ok_or_else(|| {
    ApiError::Core(Error::Persistence("create returned no record".into()))
  })?;
  tracing::info!(id = %notification.id, recipient = %notification.recipient, "notification created");
  Ok((StatusCode::CREATED, Json(notification)))
}

/// `PATCH /notifications/{id}`
pub async fn update<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
  Json(patch): Json<NotificationPatch>,
) -> Result<Json<Notification>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  Ok(Json(state.lifecycle().update(caller, id, patch).await?))
}

/// `PUT /notifications/{id}/read`
pub async fn mark_read<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  Ok(Json(state.lifecycle().mark_read(caller, id).await?))
}

/// `PUT /notifications/{id}/unread`
pub async fn mark_unread<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  Ok(Json(state.lifecycle().mark_unread(caller, id).await?))
}

/// `PUT /notifications/read-all`
pub async fn mark_all_read<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
) -> Result<Json<Value>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let updated = state.lifecycle().mark_all_read(caller).await?;
  Ok(Json(json!({ "updated": updated })))
}

/// `DELETE /notifications/{id}`
pub async fn delete_one<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  state.lifecycle().soft_delete(caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteBody {
  pub ids: Vec<Uuid>,
}

/// `DELETE /notifications` with body `{"ids": [...]}`
pub async fn bulk_delete<S, D>(
  State(state): State<AppState<S, D>>,
  Caller(caller): Caller,
  Json(body): Json<BulkDeleteBody>,
) -> Result<Json<Value>, ApiError>
where
  S: NotificationStore,
  D: UserDirectory,
{
  let deleted = state.lifecycle().bulk_soft_delete(caller, body.ids).await?;
  Ok(Json(json!({ "deleted": deleted })))
}
