//! The `NotificationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `herald-store-sqlite`).
//! The services in this crate and the HTTP layer depend on this abstraction,
//! not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  delivery::{ChannelStatus, DeliveryChannel},
  notification::{
    Category, NewNotification, Notification, NotificationPatch,
    NotificationType, Priority,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`NotificationStore::find_by_filter`] and the count
/// queries. Every filter is scoped to one recipient; active-only and
/// not-yet-expired conditions are always added by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFilter {
  pub recipient:         Uuid,
  pub notification_type: Option<NotificationType>,
  pub category:          Option<Category>,
  pub priority:          Option<Priority>,
  pub is_read:           Option<bool>,
  /// Case-insensitive substring matched against title or message.
  pub text:              Option<String>,
  /// Instant at which expiry is evaluated; defaults to now.
  pub as_of:             Option<DateTime<Utc>>,
}

impl NotificationFilter {
  pub fn for_recipient(recipient: Uuid) -> Self {
    Self {
      recipient,
      notification_type: None,
      category: None,
      priority: None,
      is_read: None,
      text: None,
      as_of: None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
  #[default]
  CreatedAt,
  UpdatedAt,
  /// By rank: low < medium < high < urgent.
  Priority,
  Title,
  ExpiresAt,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Sort specification; defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
  pub field: SortField,
  pub order: SortOrder,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page:  u32,
  limit: u32,
}

impl PageRequest {
  /// Reject non-positive values; cap `limit` at [`MAX_PAGE_LIMIT`].
  pub fn new(page: i64, limit: i64) -> Result<Self> {
    if page < 1 {
      return Err(Error::InvalidInput(format!("page must be positive, got {page}")));
    }
    if limit < 1 {
      return Err(Error::InvalidInput(format!("limit must be positive, got {limit}")));
    }
    Ok(Self {
      page:  u32::try_from(page).unwrap_or(u32::MAX),
      limit: u32::try_from(limit).unwrap_or(u32::MAX).min(MAX_PAGE_LIMIT),
    })
  }

  pub fn page(&self) -> u32 { self.page }

  pub fn limit(&self) -> u32 { self.limit }

  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.limit)
  }
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: 1, limit: DEFAULT_PAGE_LIMIT } }
}

/// One page of matching records plus the total match count.
#[derive(Debug, Clone, Default)]
pub struct Listing {
  pub items: Vec<Notification>,
  pub total: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a notification store backend.
///
/// Reads never return soft-deleted records. Every recipient-scoped method
/// treats a record owned by someone else exactly like a missing one.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NotificationStore: Send + Sync {
  /// Backend errors must map onto the core taxonomy: validation failures stay
  /// validation failures, everything else becomes [`Error::Persistence`].
  type Error: std::error::Error + Send + Sync + 'static + Into<Error>;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate, apply creation defaults, persist and return the stored record.
  fn create(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  /// Persist a batch atomically: either every record is stored or none is.
  fn insert_many(
    &self,
    inputs: Vec<NewNotification>,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Apply a validated patch. Returns `None` if not found for `recipient`.
  fn update_by_id(
    &self,
    id: Uuid,
    recipient: Uuid,
    patch: NotificationPatch,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Set `is_read` and `read_at = at` if currently unread; an already-read
  /// record is returned unchanged.
  fn mark_read(
    &self,
    id: Uuid,
    recipient: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Clear `is_read` and `read_at`; `at` becomes `updated_at` if changed.
  fn mark_unread(
    &self,
    id: Uuid,
    recipient: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Mark every unread active record of `recipient` read. Returns the number
  /// of records changed.
  fn mark_all_read(
    &self,
    recipient: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Overwrite one channel's delivery status, unless that channel is already
  /// delivered, in which case the record is returned unchanged.
  fn set_channel_status(
    &self,
    id: Uuid,
    channel: DeliveryChannel,
    status: ChannelStatus,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if nothing matched.
  fn soft_delete(
    &self,
    id: Uuid,
    recipient: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete every id in `ids` owned by `recipient`; others are skipped.
  /// Returns the number of records actually changed.
  fn bulk_soft_delete(
    &self,
    ids: Vec<Uuid>,
    recipient: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Physically delete every record created before `cutoff`, active or not.
  fn purge_created_before(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Recipient-scoped lookup of an active record.
  fn find_by_id(
    &self,
    id: Uuid,
    recipient: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Unscoped lookup of an active record, for system-side delivery updates.
  fn find_for_delivery(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  fn find_by_filter(
    &self,
    filter: NotificationFilter,
    sort: Sort,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing, Self::Error>> + Send + '_;

  fn count(
    &self,
    filter: NotificationFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Match counts per type; types with no matches are absent.
  fn count_by_type(
    &self,
    filter: NotificationFilter,
  ) -> impl Future<Output = Result<BTreeMap<NotificationType, u64>, Self::Error>> + Send + '_;

  /// Match counts per priority; priorities with no matches are absent.
  fn count_by_priority(
    &self,
    filter: NotificationFilter,
  ) -> impl Future<Output = Result<BTreeMap<Priority, u64>, Self::Error>> + Send + '_;
}

/// Convert a backend error into the core taxonomy.
pub(crate) fn store_err<E: Into<Error>>(e: E) -> Error { e.into() }
