//! Read/unread, edit, delivery and soft-delete transitions.
//!
//! Each record moves along two independent axes:
//!
//! ```text
//!   Unread ──mark_read──▶ Read ──mark_unread──▶ Unread
//!   Active ──soft_delete──▶ Deleted (terminal)
//! ```
//!
//! Expiry is not a transition: `expires_at` is compared at read time.

use std::sync::Arc;

use chrono::{SubsecRound as _, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  delivery::{ChannelStatus, DeliveryChannel, DeliveryOutcome},
  notification::{Notification, NotificationPatch},
  store::{NotificationStore, store_err},
};

pub struct LifecycleManager<S> {
  store: Arc<S>,
}

impl<S> Clone for LifecycleManager<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

impl<S: NotificationStore> LifecycleManager<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Mark a notification read. Calling this on an already-read record is a
  /// no-op and keeps the original `read_at`.
  pub async fn mark_read(&self, recipient: Uuid, id: Uuid) -> Result<Notification> {
    self
      .store
      .mark_read(id, recipient, Utc::now().trunc_subsecs(6))
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))
  }

  pub async fn mark_unread(&self, recipient: Uuid, id: Uuid) -> Result<Notification> {
    self
      .store
      .mark_unread(id, recipient, Utc::now().trunc_subsecs(6))
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))
  }

  /// Returns the number of records that changed from unread to read.
  pub async fn mark_all_read(&self, recipient: Uuid) -> Result<u64> {
    self
      .store
      .mark_all_read(recipient, Utc::now().trunc_subsecs(6))
      .await
      .map_err(store_err)
  }

  /// Apply field edits from the owning recipient.
  pub async fn update(
    &self,
    recipient: Uuid,
    id: Uuid,
    patch: NotificationPatch,
  ) -> Result<Notification> {
    let patch = patch.normalized()?;
    self
      .store
      .update_by_id(id, recipient, patch)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))
  }

  pub async fn soft_delete(&self, recipient: Uuid, id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .soft_delete(id, recipient)
      .await
      .map_err(store_err)?;
    if !deleted {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }

  /// Ids not owned by `recipient` are skipped; the count covers only
  /// records actually deleted.
  pub async fn bulk_soft_delete(&self, recipient: Uuid, ids: Vec<Uuid>) -> Result<u64> {
    if ids.is_empty() {
      return Ok(0);
    }
    self
      .store
      .bulk_soft_delete(ids, recipient)
      .await
      .map_err(store_err)
  }

  /// Record a transport outcome for one channel. Called by delivery
  /// integrations, not by recipients.
  pub async fn record_delivery(
    &self,
    id: Uuid,
    channel: DeliveryChannel,
    outcome: DeliveryOutcome,
  ) -> Result<Notification> {
    let mut record = self
      .store
      .find_for_delivery(id)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))?;

    let before: ChannelStatus = record.delivery_status.get(channel).clone();
    let after = record.delivery_status.apply(
      &record.delivery_methods,
      channel,
      outcome,
      Utc::now().trunc_subsecs(6),
    )?;
    if after == before {
      return Ok(record);
    }

    self
      .store
      .set_channel_status(id, channel, after)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))
  }
}
