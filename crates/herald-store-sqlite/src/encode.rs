//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with exactly six
//! fractional digits, so that string order equals time order. Metadata,
//! delivery methods and delivery status are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use herald_core::{
  delivery::DeliveryChannel,
  notification::{EntityType, Notification, RelatedEntity},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Drop precision the column cannot hold.
pub fn micros(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

// ─── Closed sets ─────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

/// JSON path of a channel's entry inside the `delivery_status` column.
pub fn status_path(channel: DeliveryChannel) -> &'static str {
  match channel {
    DeliveryChannel::InApp => "$.in_app",
    DeliveryChannel::Email => "$.email",
    DeliveryChannel::Push => "$.push",
    DeliveryChannel::Sms => "$.sms",
  }
}

/// Unicode lowercase for search columns. SQLite's `LIKE` only folds ASCII.
pub fn fold_case(text: &str) -> String { text.to_lowercase() }

/// `LIKE` pattern matching `text` anywhere; wildcards in `text` are literal.
/// Use with `ESCAPE '\'`.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that yields a [`RawNotification`].
pub const COLUMNS: &str = "
  notification_id, recipient_id, sender_id, title, message,
  notification_type, category, priority, is_read, read_at,
  action_url, action_text, entity_type, entity_id, metadata,
  delivery_methods, delivery_status, scheduled_for, expires_at,
  is_active, created_at, updated_at";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id:   String,
  pub recipient_id:      String,
  pub sender_id:         Option<String>,
  pub title:             String,
  pub message:           String,
  pub notification_type: String,
  pub category:          String,
  pub priority:          String,
  pub is_read:           bool,
  pub read_at:           Option<String>,
  pub action_url:        Option<String>,
  pub action_text:       Option<String>,
  pub entity_type:       Option<String>,
  pub entity_id:         Option<String>,
  pub metadata:          String,
  pub delivery_methods:  String,
  pub delivery_status:   String,
  pub scheduled_for:     Option<String>,
  pub expires_at:        String,
  pub is_active:         bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawNotification {
  /// Read a row selected with [`COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id:   row.get(0)?,
      recipient_id:      row.get(1)?,
      sender_id:         row.get(2)?,
      title:             row.get(3)?,
      message:           row.get(4)?,
      notification_type: row.get(5)?,
      category:          row.get(6)?,
      priority:          row.get(7)?,
      is_read:           row.get(8)?,
      read_at:           row.get(9)?,
      action_url:        row.get(10)?,
      action_text:       row.get(11)?,
      entity_type:       row.get(12)?,
      entity_id:         row.get(13)?,
      metadata:          row.get(14)?,
      delivery_methods:  row.get(15)?,
      delivery_status:   row.get(16)?,
      scheduled_for:     row.get(17)?,
      expires_at:        row.get(18)?,
      is_active:         row.get(19)?,
      created_at:        row.get(20)?,
      updated_at:        row.get(21)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let related_entity = match (self.entity_type, self.entity_id) {
      (Some(kind), Some(id)) => Some(RelatedEntity::new(
        decode_enum::<EntityType>("entity_type", &kind)?,
        decode_uuid(&id)?,
      )),
      _ => None,
    };

    Ok(Notification {
      id: decode_uuid(&self.notification_id)?,
      recipient: decode_uuid(&self.recipient_id)?,
      sender: self.sender_id.as_deref().map(decode_uuid).transpose()?,
      title: self.title,
      message: self.message,
      notification_type: decode_enum("notification_type", &self.notification_type)?,
      category: decode_enum("category", &self.category)?,
      priority: decode_enum("priority", &self.priority)?,
      is_read: self.is_read,
      read_at: self.read_at.as_deref().map(decode_dt).transpose()?,
      action_url: self.action_url,
      action_text: self.action_text,
      related_entity,
      metadata: serde_json::from_str(&self.metadata)?,
      delivery_methods: serde_json::from_str(&self.delivery_methods)?,
      delivery_status: serde_json::from_str(&self.delivery_status)?,
      scheduled_for: self.scheduled_for.as_deref().map(decode_dt).transpose()?,
      expires_at: decode_dt(&self.expires_at)?,
      is_active: self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column values for one `INSERT`, encoded ahead of the database call.
pub struct EncodedNotification {
  pub notification_id:   String,
  pub recipient_id:      String,
  pub sender_id:         Option<String>,
  pub title:             String,
  pub message:           String,
  pub title_folded:      String,
  pub message_folded:    String,
  pub notification_type: String,
  pub category:          String,
  pub priority:          String,
  pub is_read:           bool,
  pub read_at:           Option<String>,
  pub action_url:        Option<String>,
  pub action_text:       Option<String>,
  pub entity_type:       Option<String>,
  pub entity_id:         Option<String>,
  pub metadata:          String,
  pub delivery_methods:  String,
  pub delivery_status:   String,
  pub scheduled_for:     Option<String>,
  pub expires_at:        String,
  pub is_active:         bool,
  pub created_at:        String,
  pub updated_at:        String,
}

impl EncodedNotification {
  pub fn new(n: &Notification) -> Result<Self> {
    Ok(Self {
      notification_id:   encode_uuid(n.id),
      recipient_id:      encode_uuid(n.recipient),
      sender_id:         n.sender.map(encode_uuid),
      title:             n.title.clone(),
      message:           n.message.clone(),
      title_folded:      fold_case(&n.title),
      message_folded:    fold_case(&n.message),
      notification_type: n.notification_type.to_string(),
      category:          n.category.to_string(),
      priority:          n.priority.to_string(),
      is_read:           n.is_read,
      read_at:           n.read_at.map(encode_dt),
      action_url:        n.action_url.clone(),
      action_text:       n.action_text.clone(),
      entity_type:       n.related_entity.map(|e| e.entity_type().to_string()),
      entity_id:         n.related_entity.map(|e| encode_uuid(e.entity_id())),
      metadata:          serde_json::to_string(&n.metadata)?,
      delivery_methods:  serde_json::to_string(&n.delivery_methods)?,
      delivery_status:   serde_json::to_string(&n.delivery_status)?,
      scheduled_for:     n.scheduled_for.map(encode_dt),
      expires_at:        encode_dt(n.expires_at),
      is_active:         n.is_active,
      created_at:        encode_dt(n.created_at),
      updated_at:        encode_dt(n.updated_at),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO notifications (
         notification_id, recipient_id, sender_id, title, message,
         title_folded, message_folded,
         notification_type, category, priority, is_read, read_at,
         action_url, action_text, entity_type, entity_id, metadata,
         delivery_methods, delivery_status, scheduled_for, expires_at,
         is_active, created_at, updated_at
       ) VALUES (
         ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
         ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24
       )",
      rusqlite::params![
        self.notification_id,
        self.recipient_id,
        self.sender_id,
        self.title,
        self.message,
        self.title_folded,
        self.message_folded,
        self.notification_type,
        self.category,
        self.priority,
        self.is_read,
        self.read_at,
        self.action_url,
        self.action_text,
        self.entity_type,
        self.entity_id,
        self.metadata,
        self.delivery_methods,
        self.delivery_status,
        self.scheduled_for,
        self.expires_at,
        self.is_active,
        self.created_at,
        self.updated_at,
      ],
    )?;
    Ok(())
  }
}
