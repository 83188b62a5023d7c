//! [`SqliteStore`]: the SQLite implementation of [`NotificationStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use herald_core::{
  delivery::{ChannelStatus, DeliveryChannel},
  notification::{
    NewNotification, Notification, NotificationPatch, NotificationType, Priority,
  },
  retention::RetentionPolicy,
  store::{
    Listing, NotificationFilter, NotificationStore, PageRequest, Sort, SortField,
    SortOrder,
  },
};

use crate::{
  Result,
  encode::{
    COLUMNS, EncodedNotification, RawNotification, decode_enum, encode_dt,
    encode_uuid, fold_case, like_pattern, micros, status_path,
  },
  schema::SCHEMA,
};

/// Sort key for priority: low < medium < high < urgent.
const PRIORITY_RANK: &str = "CASE priority
  WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 WHEN 'urgent' THEN 3
END";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A notification store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  retention:       RetentionPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, retention: RetentionPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, retention: RetentionPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Use `retention` for the default expiry of new records.
  pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
    self.retention = retention;
    self
  }

  pub fn retention(&self) -> RetentionPolicy { self.retention }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Validate `input` and build the record to insert, with every timestamp
  /// at column precision.
  fn build(&self, input: NewNotification, now: DateTime<Utc>) -> Result<Notification> {
    let mut record =
      input.into_record(Uuid::new_v4(), micros(now), self.retention.expire_after())?;
    record.expires_at = micros(record.expires_at);
    record.scheduled_for = record.scheduled_for.map(micros);
    Ok(record)
  }

  /// Run `UPDATE notifications SET {set} WHERE {scope}` and read the row back.
  /// `None` if the scope matched nothing.
  async fn update_and_fetch(
    &self,
    set: String,
    scope: Scope,
    mut params: Vec<Value>,
  ) -> Result<Option<Notification>> {
    let (where_sql, scope_params) = scope.clause();
    params.extend(scope_params.iter().cloned());

    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("UPDATE notifications SET {set} WHERE {where_sql}"),
          rusqlite::params_from_iter(params),
        )?;
        Ok(select_one(conn, &where_sql, scope_params)?)
      })
      .await?;

    raw.map(RawNotification::into_notification).transpose()
  }

  async fn fetch(&self, scope: Scope) -> Result<Option<Notification>> {
    let (where_sql, params) = scope.clause();
    let raw: Option<RawNotification> = self
      .conn
      .call(move |conn| Ok(select_one(conn, &where_sql, params)?))
      .await?;
    raw.map(RawNotification::into_notification).transpose()
  }

  /// `(key, count)` pairs for `filter`, grouped by `column`.
  async fn grouped_counts(
    &self,
    column: &'static str,
    filter: NotificationFilter,
  ) -> Result<Vec<(String, u64)>> {
    let (where_sql, params) = filter_clause(&filter);
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {column}, COUNT(*) FROM notifications
           WHERE {where_sql}
           GROUP BY {column}"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows.into_iter().map(|(k, n)| (k, n as u64)).collect())
  }
}

// ─── SQL fragments ───────────────────────────────────────────────────────────

/// Which active row a single-record operation addresses.
enum Scope {
  /// The record, only if owned by the recipient.
  Owned { id: Uuid, recipient: Uuid },
  /// The record regardless of owner.
  Any(Uuid),
}

impl Scope {
  fn clause(&self) -> (String, Vec<Value>) {
    match *self {
      Self::Owned { id, recipient } => (
        "notification_id = ? AND recipient_id = ? AND is_active = 1".to_owned(),
        vec![Value::Text(encode_uuid(id)), Value::Text(encode_uuid(recipient))],
      ),
      Self::Any(id) => (
        "notification_id = ? AND is_active = 1".to_owned(),
        vec![Value::Text(encode_uuid(id))],
      ),
    }
  }
}

fn select_one(
  conn: &rusqlite::Connection,
  where_sql: &str,
  params: Vec<Value>,
) -> rusqlite::Result<Option<RawNotification>> {
  conn
    .query_row(
      &format!("SELECT {COLUMNS} FROM notifications WHERE {where_sql}"),
      rusqlite::params_from_iter(params),
      RawNotification::from_row,
    )
    .optional()
}

/// `WHERE` body for a recipient-scoped filter: always active-only and not
/// yet expired at `as_of`.
fn filter_clause(filter: &NotificationFilter) -> (String, Vec<Value>) {
  let as_of = filter.as_of.unwrap_or_else(Utc::now);
  let mut conds = vec!["recipient_id = ?", "is_active = 1", "expires_at > ?"];
  let mut params = vec![
    Value::Text(encode_uuid(filter.recipient)),
    Value::Text(encode_dt(as_of)),
  ];

  if let Some(t) = filter.notification_type {
    conds.push("notification_type = ?");
    params.push(Value::Text(t.to_string()));
  }
  if let Some(c) = filter.category {
    conds.push("category = ?");
    params.push(Value::Text(c.to_string()));
  }
  if let Some(p) = filter.priority {
    conds.push("priority = ?");
    params.push(Value::Text(p.to_string()));
  }
  if let Some(read) = filter.is_read {
    conds.push("is_read = ?");
    params.push(Value::Integer(i64::from(read)));
  }
  if let Some(text) = &filter.text {
    conds.push("(title_folded LIKE ? ESCAPE '\\' OR message_folded LIKE ? ESCAPE '\\')");
    let pattern = like_pattern(&fold_case(text));
    params.push(Value::Text(pattern.clone()));
    params.push(Value::Text(pattern));
  }

  (conds.join(" AND "), params)
}

/// `ORDER BY` body. Ties fall back to insertion order in the same direction.
fn order_clause(sort: Sort) -> String {
  let key = match sort.field {
    SortField::CreatedAt => "created_at",
    SortField::UpdatedAt => "updated_at",
    SortField::Priority => PRIORITY_RANK,
    SortField::Title => "title COLLATE NOCASE",
    SortField::ExpiresAt => "expires_at",
  };
  let dir = match sort.order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  };
  format!("{key} {dir}, rowid {dir}")
}

// ─── NotificationStore impl ──────────────────────────────────────────────────

impl NotificationStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, input: NewNotification) -> Result<Notification> {
    let record = self.build(input, Utc::now())?;
    let row = EncodedNotification::new(&record)?;

    self
      .conn
      .call(move |conn| {
        row.insert(conn)?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn insert_many(&self, inputs: Vec<NewNotification>) -> Result<Vec<Notification>> {
    let now = Utc::now();
    let records = inputs
      .into_iter()
      .map(|input| self.build(input, now))
      .collect::<Result<Vec<_>>>()?;
    let rows = records
      .iter()
      .map(EncodedNotification::new)
      .collect::<Result<Vec<_>>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for row in &rows {
          row.insert(&tx)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(records)
  }

  async fn update_by_id(
    &self,
    id: Uuid,
    recipient: Uuid,
    patch: NotificationPatch,
  ) -> Result<Option<Notification>> {
    let mut set = vec!["updated_at = ?"];
    let mut params = vec![Value::Text(encode_dt(micros(Utc::now())))];

    let mut text = |column, value: Option<String>| {
      if let Some(v) = value {
        set.push(column);
        params.push(Value::Text(v));
      }
    };
    let title_folded = patch.title.as_deref().map(fold_case);
    let message_folded = patch.message.as_deref().map(fold_case);
    text("title = ?", patch.title);
    text("title_folded = ?", title_folded);
    text("message = ?", patch.message);
    text("message_folded = ?", message_folded);
    text("priority = ?", patch.priority.map(|p| p.to_string()));
    text("action_url = ?", patch.action_url);
    text("action_text = ?", patch.action_text);
    text(
      "metadata = ?",
      patch.metadata.as_ref().map(serde_json::to_string).transpose()?,
    );
    text(
      "delivery_methods = ?",
      patch
        .delivery_methods
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?,
    );
    text("scheduled_for = ?", patch.scheduled_for.map(|at| encode_dt(micros(at))));
    text("expires_at = ?", patch.expires_at.map(|at| encode_dt(micros(at))));

    self
      .update_and_fetch(set.join(", "), Scope::Owned { id, recipient }, params)
      .await
  }

  async fn mark_read(
    &self,
    id: Uuid,
    recipient: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Option<Notification>> {
    let at = Value::Text(encode_dt(micros(at)));
    // The CASE keeps `read_at` and `updated_at` of an already-read record.
    self
      .update_and_fetch(
        "read_at    = CASE WHEN is_read = 0 THEN ? ELSE read_at END,
         updated_at = CASE WHEN is_read = 0 THEN ? ELSE updated_at END,
         is_read    = 1"
          .to_owned(),
        Scope::Owned { id, recipient },
        vec![at.clone(), at],
      )
      .await
  }

  async fn mark_unread(
    &self,
    id: Uuid,
    recipient: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Option<Notification>> {
    let at = Value::Text(encode_dt(micros(at)));
    self
      .update_and_fetch(
        "updated_at = CASE WHEN is_read = 1 THEN ? ELSE updated_at END,
         read_at    = NULL,
         is_read    = 0"
          .to_owned(),
        Scope::Owned { id, recipient },
        vec![at],
      )
      .await
  }

  async fn mark_all_read(&self, recipient: Uuid, at: DateTime<Utc>) -> Result<u64> {
    let recipient_str = encode_uuid(recipient);
    let at_str = encode_dt(micros(at));

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications
           SET is_read = 1, read_at = ?1, updated_at = ?1
           WHERE recipient_id = ?2 AND is_active = 1 AND is_read = 0",
          rusqlite::params![at_str, recipient_str],
        )?)
      })
      .await?;

    Ok(changed as u64)
  }

  async fn set_channel_status(
    &self,
    id: Uuid,
    channel: DeliveryChannel,
    status: ChannelStatus,
  ) -> Result<Option<Notification>> {
    let path = status_path(channel);
    let params = vec![
      Value::Text(format!("{path}.delivered")),
      Value::Text(path.to_owned()),
      Value::Text(serde_json::to_string(&status)?),
      Value::Text(encode_dt(micros(Utc::now()))),
    ];
    // A delivered channel is terminal; the guard and the write are one
    // statement so concurrent reports cannot undo a delivery.
    self
      .update_and_fetch(
        "delivery_status = CASE WHEN json_extract(delivery_status, ?1) = 1
           THEN delivery_status
           ELSE json_set(delivery_status, ?2, json(?3)) END,
         updated_at = CASE WHEN json_extract(delivery_status, ?1) = 1
           THEN updated_at
           ELSE ?4 END"
          .to_owned(),
        Scope::Any(id),
        params,
      )
      .await
  }

  async fn soft_delete(&self, id: Uuid, recipient: Uuid) -> Result<bool> {
    Ok(self.bulk_soft_delete(vec![id], recipient).await? > 0)
  }

  async fn bulk_soft_delete(&self, ids: Vec<Uuid>, recipient: Uuid) -> Result<u64> {
    let recipient_str = encode_uuid(recipient);
    let at_str = encode_dt(micros(Utc::now()));
    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE notifications SET is_active = 0, updated_at = ?1
             WHERE notification_id = ?2 AND recipient_id = ?3 AND is_active = 1",
          )?;
          for id in &id_strs {
            changed += stmt.execute(rusqlite::params![at_str, id, recipient_str])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    Ok(changed as u64)
  }

  async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
    let cutoff_str = encode_dt(micros(cutoff));
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM notifications WHERE created_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(deleted as u64)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn find_by_id(&self, id: Uuid, recipient: Uuid) -> Result<Option<Notification>> {
    self.fetch(Scope::Owned { id, recipient }).await
  }

  async fn find_for_delivery(&self, id: Uuid) -> Result<Option<Notification>> {
    self.fetch(Scope::Any(id)).await
  }

  async fn find_by_filter(
    &self,
    filter: NotificationFilter,
    sort: Sort,
    page: PageRequest,
  ) -> Result<Listing> {
    let (where_sql, params) = filter_clause(&filter);
    let order = order_clause(sort);
    let limit = i64::from(page.limit());
    let offset = page.offset() as i64;

    let (total, raws): (i64, Vec<RawNotification>) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM notifications WHERE {where_sql}"),
          rusqlite::params_from_iter(params.iter()),
          |r| r.get(0),
        )?;

        let mut paged = params;
        paged.push(Value::Integer(limit));
        paged.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&format!(
          "SELECT {COLUMNS} FROM notifications
           WHERE {where_sql}
           ORDER BY {order}
           LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(paged), RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    let items = raws
      .into_iter()
      .map(RawNotification::into_notification)
      .collect::<Result<_>>()?;

    Ok(Listing { items, total: total as u64 })
  }

  async fn count(&self, filter: NotificationFilter) -> Result<u64> {
    let (where_sql, params) = filter_clause(&filter);
    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM notifications WHERE {where_sql}"),
          rusqlite::params_from_iter(params),
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(total as u64)
  }

  async fn count_by_type(
    &self,
    filter: NotificationFilter,
  ) -> Result<BTreeMap<NotificationType, u64>> {
    self
      .grouped_counts("notification_type", filter)
      .await?
      .into_iter()
      .map(|(key, n)| {
        Ok::<_, crate::Error>((decode_enum::<NotificationType>("notification_type", &key)?, n))
      })
      .collect()
  }

  async fn count_by_priority(
    &self,
    filter: NotificationFilter,
  ) -> Result<BTreeMap<Priority, u64>> {
    self
      .grouped_counts("priority", filter)
      .await?
      .into_iter()
      .map(|(key, n)| Ok::<_, crate::Error>((decode_enum::<Priority>("priority", &key)?, n)))
      .collect()
  }
}
