//! Notification types: the persisted record and its creation and update inputs.
//!
//! A notification belongs to exactly one recipient. A single event addressed
//! to many users produces one independent record per user.

use std::{collections::BTreeMap, future::Future};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  delivery::{DeliveryMethods, DeliveryStatus, default_methods},
};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_ACTION_TEXT_LEN: usize = 50;

// ─── Classification ──────────────────────────────────────────────────────────

/// Semantic classification; drives the icon and colour in the UI.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationType {
  Success,
  Warning,
  Error,
  Info,
  Task,
  Project,
  System,
  Hr,
  Finance,
  Content,
}

/// Functional grouping, independent of [`NotificationType`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
  Task,
  Project,
  User,
  Hr,
  Finance,
  Content,
  System,
  Security,
  Audit,
  Sprint,
  Team,
  Analytics,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Urgent,
}

impl Priority {
  /// Numeric rank used for sorting; higher is more pressing.
  pub fn rank(self) -> u8 {
    match self {
      Self::Low => 0,
      Self::Medium => 1,
      Self::High => 2,
      Self::Urgent => 3,
    }
  }
}

// ─── Related entity ──────────────────────────────────────────────────────────

/// The kinds of domain entity a notification can point at.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
pub enum EntityType {
  Task,
  Project,
  User,
  Employee,
  Sprint,
  Team,
  Finance,
  Content,
  Attendance,
  Leave,
  Payroll,
  Role,
}

/// A weak reference to the domain entity that triggered a notification.
/// Lookup-only: the entity is neither owned nor cascaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity_id")]
pub enum RelatedEntity {
  Task(Uuid),
  Project(Uuid),
  User(Uuid),
  Employee(Uuid),
  Sprint(Uuid),
  Team(Uuid),
  Finance(Uuid),
  Content(Uuid),
  Attendance(Uuid),
  Leave(Uuid),
  Payroll(Uuid),
  Role(Uuid),
}

impl RelatedEntity {
  pub fn new(entity_type: EntityType, id: Uuid) -> Self {
    match entity_type {
      EntityType::Task => Self::Task(id),
      EntityType::Project => Self::Project(id),
      EntityType::User => Self::User(id),
      EntityType::Employee => Self::Employee(id),
      EntityType::Sprint => Self::Sprint(id),
      EntityType::Team => Self::Team(id),
      EntityType::Finance => Self::Finance(id),
      EntityType::Content => Self::Content(id),
      EntityType::Attendance => Self::Attendance(id),
      EntityType::Leave => Self::Leave(id),
      EntityType::Payroll => Self::Payroll(id),
      EntityType::Role => Self::Role(id),
    }
  }

  pub fn entity_type(&self) -> EntityType {
    match self {
      Self::Task(_) => EntityType::Task,
      Self::Project(_) => EntityType::Project,
      Self::User(_) => EntityType::User,
      Self::Employee(_) => EntityType::Employee,
      Self::Sprint(_) => EntityType::Sprint,
      Self::Team(_) => EntityType::Team,
      Self::Finance(_) => EntityType::Finance,
      Self::Content(_) => EntityType::Content,
      Self::Attendance(_) => EntityType::Attendance,
      Self::Leave(_) => EntityType::Leave,
      Self::Payroll(_) => EntityType::Payroll,
      Self::Role(_) => EntityType::Role,
    }
  }

  pub fn entity_id(&self) -> Uuid {
    match *self {
      Self::Task(id)
      | Self::Project(id)
      | Self::User(id)
      | Self::Employee(id)
      | Self::Sprint(id)
      | Self::Team(id)
      | Self::Finance(id)
      | Self::Content(id)
      | Self::Attendance(id)
      | Self::Leave(id)
      | Self::Payroll(id)
      | Self::Role(id) => id,
    }
  }

  /// Look this entity up through `resolver`, dispatching on the variant.
  pub async fn resolve<R: EntityResolver>(
    &self,
    resolver: &R,
  ) -> Result<Option<EntitySummary>> {
    let label = match *self {
      Self::Task(id) => resolver.task(id).await,
      Self::Project(id) => resolver.project(id).await,
      Self::User(id) => resolver.user(id).await,
      Self::Employee(id) => resolver.employee(id).await,
      Self::Sprint(id) => resolver.sprint(id).await,
      Self::Team(id) => resolver.team(id).await,
      Self::Finance(id) => resolver.finance(id).await,
      Self::Content(id) => resolver.content(id).await,
      Self::Attendance(id) => resolver.attendance(id).await,
      Self::Leave(id) => resolver.leave(id).await,
      Self::Payroll(id) => resolver.payroll(id).await,
      Self::Role(id) => resolver.role(id).await,
    }
    .map_err(|e| Error::Lookup(Box::new(e)))?;

    Ok(label.map(|label| EntitySummary { entity: *self, label }))
  }
}

/// A display label for a resolved [`RelatedEntity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
  pub entity: RelatedEntity,
  pub label:  String,
}

/// Read-only lookups into the domain modules that own each entity type.
///
/// Every method defaults to "unknown", so an implementation only needs to
/// cover the entity types it actually owns.
pub trait EntityResolver: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn task(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn project(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn user(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn employee(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn sprint(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn team(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn finance(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn content(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn attendance(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn leave(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn payroll(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
  fn role(&self, _id: Uuid) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send {
    async { Ok(None) }
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// A single metadata value. The set of shapes is closed so that values
/// survive a storage round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetaValue {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
  Timestamp(DateTime<Utc>),
  Date(NaiveDate),
  List(Vec<MetaValue>),
}

impl MetaValue {
  /// JSON has no NaN or infinity; such floats would not read back.
  fn is_finite(&self) -> bool {
    match self {
      Self::Float(f) => f.is_finite(),
      Self::List(items) => items.iter().all(Self::is_finite),
      _ => true,
    }
  }
}

impl From<bool> for MetaValue {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for MetaValue {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<u32> for MetaValue {
  fn from(v: u32) -> Self { Self::Int(i64::from(v)) }
}

impl From<f64> for MetaValue {
  fn from(v: f64) -> Self { Self::Float(v) }
}

impl From<&str> for MetaValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for MetaValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<DateTime<Utc>> for MetaValue {
  fn from(v: DateTime<Utc>) -> Self { Self::Timestamp(v) }
}

impl From<NaiveDate> for MetaValue {
  fn from(v: NaiveDate) -> Self { Self::Date(v) }
}

impl<T: Into<MetaValue>> From<Option<T>> for MetaValue {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Event-specific auxiliary data, keyed by name.
pub type Metadata = BTreeMap<String, MetaValue>;

// ─── Notification ────────────────────────────────────────────────────────────

/// A persisted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id:                Uuid,
  pub recipient:         Uuid,
  pub sender:            Option<Uuid>,
  pub title:             String,
  pub message:           String,
  #[serde(rename = "type")]
  pub notification_type: NotificationType,
  pub category:          Category,
  pub priority:          Priority,
  pub is_read:           bool,
  /// Set exactly when `is_read` is `true`.
  pub read_at:           Option<DateTime<Utc>>,
  pub action_url:        Option<String>,
  pub action_text:       Option<String>,
  pub related_entity:    Option<RelatedEntity>,
  pub metadata:          Metadata,
  pub delivery_methods:  DeliveryMethods,
  pub delivery_status:   DeliveryStatus,
  pub scheduled_for:     Option<DateTime<Utc>>,
  pub expires_at:        DateTime<Utc>,
  /// `false` once soft-deleted; inactive records are invisible to reads.
  pub is_active:         bool,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Notification {
  pub fn is_urgent(&self) -> bool { self.priority == Priority::Urgent }

  /// Scheduled time has passed and the recipient still hasn't read it.
  pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
    !self.is_read && self.scheduled_for.is_some_and(|at| at < now)
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }

  /// Human-readable age relative to `now`.
  pub fn time_ago(&self, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(self.created_at);
    let (n, unit) = if age.num_days() > 0 {
      (age.num_days(), "day")
    } else if age.num_hours() > 0 {
      (age.num_hours(), "hour")
    } else if age.num_minutes() > 0 {
      (age.num_minutes(), "minute")
    } else {
      return "Just now".to_owned();
    };
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural} ago")
  }
}

// ─── NewNotification ─────────────────────────────────────────────────────────

/// Input to [`crate::store::NotificationStore::create`].
///
/// `id`, timestamps, read state and delivery status are never accepted from
/// callers; [`NewNotification::into_record`] fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
  pub recipient:         Uuid,
  #[serde(default)]
  pub sender:            Option<Uuid>,
  pub title:             String,
  pub message:           String,
  #[serde(rename = "type")]
  pub notification_type: NotificationType,
  pub category:          Category,
  #[serde(default)]
  pub priority:          Priority,
  #[serde(default)]
  pub action_url:        Option<String>,
  #[serde(default)]
  pub action_text:       Option<String>,
  #[serde(default)]
  pub related_entity:    Option<RelatedEntity>,
  #[serde(default)]
  pub metadata:          Metadata,
  #[serde(default = "default_methods")]
  pub delivery_methods:  DeliveryMethods,
  #[serde(default)]
  pub scheduled_for:     Option<DateTime<Utc>>,
  /// Defaults to creation time plus the store's expiry window.
  #[serde(default)]
  pub expires_at:        Option<DateTime<Utc>>,
}

impl NewNotification {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(
    recipient: Uuid,
    notification_type: NotificationType,
    category: Category,
    title: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self {
      recipient,
      sender: None,
      title: title.into(),
      message: message.into(),
      notification_type,
      category,
      priority: Priority::default(),
      action_url: None,
      action_text: None,
      related_entity: None,
      metadata: Metadata::new(),
      delivery_methods: default_methods(),
      scheduled_for: None,
      expires_at: None,
    }
  }

  pub fn priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  pub fn sender(mut self, sender: Option<Uuid>) -> Self {
    self.sender = sender;
    self
  }

  pub fn action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
    self.action_url = Some(url.into());
    self.action_text = Some(text.into());
    self
  }

  pub fn related(mut self, entity: RelatedEntity) -> Self {
    self.related_entity = Some(entity);
    self
  }

  pub fn meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
    self.metadata.insert(key.to_owned(), value.into());
    self
  }

  pub fn channels(mut self, methods: DeliveryMethods) -> Self {
    self.delivery_methods = methods;
    self
  }

  pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
    self.scheduled_for = Some(at);
    self
  }

  pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
    self.expires_at = Some(at);
    self
  }

  /// Check required fields, length bounds and references.
  pub fn validate(&self) -> Result<()> {
    check_user_ref("recipient", self.recipient)?;
    if let Some(sender) = self.sender {
      check_user_ref("sender", sender)?;
    }
    check_text("title", &self.title, MAX_TITLE_LEN)?;
    check_text("message", &self.message, MAX_MESSAGE_LEN)?;
    check_action(self.action_url.as_deref(), self.action_text.as_deref())?;
    check_methods(&self.delivery_methods)?;
    check_metadata(&self.metadata)?;
    Ok(())
  }

  /// Validate and build the full record, applying every construction-time
  /// default: trimmed text, unread/active state, in-app delivery at
  /// `now`, and `expires_at = now + default_expiry` unless supplied.
  pub fn into_record(
    self,
    id: Uuid,
    now: DateTime<Utc>,
    default_expiry: Duration,
  ) -> Result<Notification> {
    self.validate()?;
    let expires_at = match self.expires_at {
      Some(at) => at,
      None => now
        .checked_add_signed(default_expiry)
        .ok_or_else(|| Error::validation("expires_at", "default expiry is out of range"))?,
    };
    Ok(Notification {
      id,
      recipient: self.recipient,
      sender: self.sender,
      title: self.title.trim().to_owned(),
      message: self.message.trim().to_owned(),
      notification_type: self.notification_type,
      category: self.category,
      priority: self.priority,
      is_read: false,
      read_at: None,
      action_url: self.action_url.map(|s| s.trim().to_owned()),
      action_text: self.action_text.map(|s| s.trim().to_owned()),
      related_entity: self.related_entity,
      metadata: self.metadata,
      delivery_methods: self.delivery_methods,
      delivery_status: DeliveryStatus::initial(now),
      scheduled_for: self.scheduled_for,
      expires_at,
      is_active: true,
      created_at: now,
      updated_at: now,
    })
  }
}

// ─── NotificationPatch ───────────────────────────────────────────────────────

/// Partial update applied by the owning recipient. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPatch {
  pub title:            Option<String>,
  pub message:          Option<String>,
  pub priority:         Option<Priority>,
  pub action_url:       Option<String>,
  pub action_text:      Option<String>,
  pub metadata:         Option<Metadata>,
  pub delivery_methods: Option<DeliveryMethods>,
  pub scheduled_for:    Option<DateTime<Utc>>,
  pub expires_at:       Option<DateTime<Utc>>,
}

impl NotificationPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Validate every supplied field and return the patch with text trimmed.
  pub fn normalized(self) -> Result<Self> {
    if self.is_empty() {
      return Err(Error::InvalidInput("update contains no fields".into()));
    }
    if let Some(title) = &self.title {
      check_text("title", title, MAX_TITLE_LEN)?;
    }
    if let Some(message) = &self.message {
      check_text("message", message, MAX_MESSAGE_LEN)?;
    }
    if let Some(url) = &self.action_url {
      check_text("action_url", url, usize::MAX)?;
    }
    if let Some(text) = &self.action_text {
      check_text("action_text", text, MAX_ACTION_TEXT_LEN)?;
    }
    if let Some(methods) = &self.delivery_methods {
      check_methods(methods)?;
    }
    if let Some(metadata) = &self.metadata {
      check_metadata(metadata)?;
    }

    let trim = |s: String| s.trim().to_owned();
    Ok(Self {
      title: self.title.map(trim),
      message: self.message.map(trim),
      action_url: self.action_url.map(trim),
      action_text: self.action_text.map(trim),
      ..self
    })
  }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

fn check_user_ref(field: &'static str, id: Uuid) -> Result<()> {
  if id.is_nil() {
    return Err(Error::validation(field, "must reference a user"));
  }
  Ok(())
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<()> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::validation(field, "is required"));
  }
  if trimmed.chars().count() > max {
    return Err(Error::validation(
      field,
      format!("must be at most {max} characters"),
    ));
  }
  Ok(())
}

fn check_action(url: Option<&str>, text: Option<&str>) -> Result<()> {
  if let Some(url) = url {
    check_text("action_url", url, usize::MAX)?;
  }
  if let Some(text) = text {
    check_text("action_text", text, MAX_ACTION_TEXT_LEN)?;
  }
  Ok(())
}

fn check_methods(methods: &DeliveryMethods) -> Result<()> {
  if methods.is_empty() {
    return Err(Error::validation(
      "delivery_method",
      "at least one channel is required",
    ));
  }
  Ok(())
}

fn check_metadata(metadata: &Metadata) -> Result<()> {
  if metadata.keys().any(|k| k.trim().is_empty()) {
    return Err(Error::validation("metadata", "keys must not be empty"));
  }
  if let Some((key, _)) = metadata.iter().find(|(_, v)| !v.is_finite()) {
    return Err(Error::validation(
      "metadata",
      format!("{key}: numbers must be finite"),
    ));
  }
  Ok(())
}
