//! Fan-out: one event, many recipients, one record each.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  delivery::{DeliveryMethods, default_methods},
  directory::UserDirectory,
  notification::{
    Category, Metadata, NewNotification, Notification, NotificationType,
    Priority, RelatedEntity,
  },
  store::{NotificationStore, store_err},
};

// ─── Template ────────────────────────────────────────────────────────────────

/// Everything a notification needs except its recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTemplate {
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
  #[serde(default)]
  pub expires_at:        Option<DateTime<Utc>>,
}

impl NotificationTemplate {
  pub fn for_recipient(&self, recipient: Uuid) -> NewNotification {
    NewNotification {
      recipient,
      sender: self.sender,
      title: self.title.clone(),
      message: self.message.clone(),
      notification_type: self.notification_type,
      category: self.category,
      priority: self.priority,
      action_url: self.action_url.clone(),
      action_text: self.action_text.clone(),
      related_entity: self.related_entity,
      metadata: self.metadata.clone(),
      delivery_methods: self.delivery_methods.clone(),
      scheduled_for: self.scheduled_for,
      expires_at: self.expires_at,
    }
  }

  /// One record per distinct recipient, in first-seen order.
  pub fn fan_out(
    &self,
    recipients: impl IntoIterator<Item = Uuid>,
  ) -> Vec<NewNotification> {
    let mut seen = HashSet::new();
    recipients
      .into_iter()
      .filter(|id| seen.insert(*id))
      .map(|id| self.for_recipient(id))
      .collect()
  }
}

/// Keeps every field except `recipient`.
impl From<NewNotification> for NotificationTemplate {
  fn from(n: NewNotification) -> Self {
    Self {
      sender:            n.sender,
      title:             n.title,
      message:           n.message,
      notification_type: n.notification_type,
      category:          n.category,
      priority:          n.priority,
      action_url:        n.action_url,
      action_text:       n.action_text,
      related_entity:    n.related_entity,
      metadata:          n.metadata,
      delivery_methods:  n.delivery_methods,
      scheduled_for:     n.scheduled_for,
      expires_at:        n.expires_at,
    }
  }
}

// ─── Helper ──────────────────────────────────────────────────────────────────

pub struct FanoutHelper<S, D> {
  store:     Arc<S>,
  directory: Arc<D>,
}

impl<S, D> Clone for FanoutHelper<S, D> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), directory: self.directory.clone() }
  }
}

impl<S: NotificationStore, D: UserDirectory> FanoutHelper<S, D> {
  pub fn new(store: Arc<S>, directory: Arc<D>) -> Self { Self { store, directory } }

  /// Replicate `template` once per recipient and store the batch in a single
  /// all-or-nothing insert. Every recipient must exist in the directory.
  pub async fn notify_many(
    &self,
    recipients: Vec<Uuid>,
    template: NotificationTemplate,
  ) -> Result<Vec<Notification>> {
    let records = template.fan_out(recipients);
    validate_all(&records)?;
    ensure_known_users(self.directory.as_ref(), &records).await?;
    persist_batch(self.store.as_ref(), records).await
  }

  /// Send `template` to every active user holding `role`. A role with no
  /// active users yields an empty result without touching the store.
  pub async fn notify_by_role(
    &self,
    role: &str,
    template: NotificationTemplate,
  ) -> Result<Vec<Notification>> {
    let users = self
      .directory
      .find_users_by_role(role.to_owned())
      .await
      .map_err(|e| Error::Lookup(Box::new(e)))?;

    let records = template.fan_out(users.into_iter().filter(|u| u.active).map(|u| u.user_id));
    validate_all(&records)?;
    ensure_known_users(self.directory.as_ref(), &records).await?;
    persist_batch(self.store.as_ref(), records).await
  }
}

// ─── Shared persistence path ─────────────────────────────────────────────────

pub(crate) fn validate_all(records: &[NewNotification]) -> Result<()> {
  records.iter().try_for_each(NewNotification::validate)
}

/// Write already-validated records with exactly one store call.
pub(crate) async fn persist_batch<S: NotificationStore>(
  store: &S,
  mut records: Vec<NewNotification>,
) -> Result<Vec<Notification>> {
  match records.len() {
    0 => Ok(Vec::new()),
    1 => {
      let record = records.remove(0);
      Ok(vec![store.create(record).await.map_err(store_err)?])
    }
    _ => store.insert_many(records).await.map_err(store_err),
  }
}

/// Every recipient and sender referenced by `records` must be a known user.
pub(crate) async fn ensure_known_users<D: UserDirectory>(
  directory: &D,
  records: &[NewNotification],
) -> Result<()> {
  let mut refs: Vec<(&'static str, Uuid)> = Vec::with_capacity(records.len() * 2);
  for r in records {
    refs.push(("recipient", r.recipient));
    refs.extend(r.sender.map(|s| ("sender", s)));
  }

  let mut checked = HashSet::new();
  for (field, id) in refs {
    if !checked.insert(id) {
      continue;
    }
    let found = directory
      .find_user_by_id(id)
      .await
      .map_err(|e| Error::Lookup(Box::new(e)))?;
    if found.is_none() {
      return Err(Error::validation(field, format!("unknown user {id}")));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn template() -> NotificationTemplate {
    NewNotification::new(
      Uuid::nil(),
      NotificationType::System,
      Category::System,
      "Scheduled Maintenance",
      "The system will be unavailable tonight",
    )
    .priority(Priority::High)
    .into()
  }

  #[test]
  fn fan_out_copies_template_per_distinct_recipient() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let records = template().fan_out([a, b, a]);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].recipient, a);
    assert_eq!(records[1].recipient, b);
    assert!(records.iter().all(|r| r.priority == Priority::High));
    assert!(records.iter().all(|r| r.title == "Scheduled Maintenance"));
  }

  #[test]
  fn fan_out_of_nobody_is_empty() {
    assert!(template().fan_out([]).is_empty());
  }
}
