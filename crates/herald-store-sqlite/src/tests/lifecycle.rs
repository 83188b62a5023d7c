use std::sync::Arc;

use herald_core::{
  Error,
  delivery::{DeliveryChannel, DeliveryMethods, DeliveryOutcome},
  lifecycle::LifecycleManager,
  notification::NotificationPatch,
  store::{NotificationFilter, NotificationStore},
};
use uuid::Uuid;

use super::{note, store};
use crate::SqliteStore;

async fn manager() -> (Arc<SqliteStore>, LifecycleManager<SqliteStore>) {
  let s = Arc::new(store().await);
  (s.clone(), LifecycleManager::new(s))
}

#[tokio::test]
async fn mark_read_twice_keeps_first_read_at() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let n = s.create(note(recipient, "hello")).await.unwrap();

  let first = lm.mark_read(recipient, n.id).await.unwrap();
  assert!(first.is_read);
  assert!(first.read_at.is_some());

  let second = lm.mark_read(recipient, n.id).await.unwrap();
  assert_eq!(second.read_at, first.read_at);
}

#[tokio::test]
async fn mark_unread_restores_unread_state() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let n = s.create(note(recipient, "hello")).await.unwrap();

  lm.mark_read(recipient, n.id).await.unwrap();
  let unread = lm.mark_unread(recipient, n.id).await.unwrap();
  assert!(!unread.is_read);
  assert!(unread.read_at.is_none());
}

#[tokio::test]
async fn transitions_on_foreign_record_are_not_found() {
  let (s, lm) = manager().await;
  let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
  let n = s.create(note(owner, "private")).await.unwrap();

  assert!(matches!(lm.mark_read(stranger, n.id).await, Err(Error::NotFound(id)) if id == n.id));
  assert!(matches!(lm.soft_delete(stranger, n.id).await, Err(Error::NotFound(_))));
  assert!(matches!(lm.mark_read(owner, Uuid::new_v4()).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn mark_all_read_counts_only_changed_records() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let a = s.create(note(recipient, "a")).await.unwrap();
  s.create(note(recipient, "b")).await.unwrap();
  s.create(note(recipient, "c")).await.unwrap();
  s.create(note(Uuid::new_v4(), "someone else's")).await.unwrap();

  lm.mark_read(recipient, a.id).await.unwrap();
  assert_eq!(lm.mark_all_read(recipient).await.unwrap(), 2);
  assert_eq!(lm.mark_all_read(recipient).await.unwrap(), 0);

  let unread = NotificationFilter {
    is_read: Some(false),
    ..NotificationFilter::for_recipient(recipient)
  };
  assert_eq!(s.count(unread).await.unwrap(), 0);
}

#[tokio::test]
async fn update_validates_and_trims() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let n = s.create(note(recipient, "draft")).await.unwrap();

  let err = lm
    .update(recipient, n.id, NotificationPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let too_long = NotificationPatch { title: Some("x".repeat(101)), ..Default::default() };
  let err = lm.update(recipient, n.id, too_long).await.unwrap_err();
  assert_eq!(err.field(), Some("title"));

  let patch = NotificationPatch { message: Some("  revised  ".into()), ..Default::default() };
  let updated = lm.update(recipient, n.id, patch).await.unwrap();
  assert_eq!(updated.message, "revised");
}

#[tokio::test]
async fn bulk_delete_counts_only_owned_records() {
  let (s, lm) = manager().await;
  let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
  let mine = s.create(note(owner, "mine")).await.unwrap();
  let theirs = s.create(note(other, "theirs")).await.unwrap();

  assert_eq!(lm.bulk_soft_delete(owner, vec![mine.id, theirs.id]).await.unwrap(), 1);
  assert_eq!(lm.bulk_soft_delete(owner, Vec::new()).await.unwrap(), 0);
  assert!(s.find_by_id(theirs.id, other).await.unwrap().is_some());
}

#[tokio::test]
async fn soft_delete_is_terminal() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let n = s.create(note(recipient, "gone")).await.unwrap();

  lm.soft_delete(recipient, n.id).await.unwrap();
  assert!(matches!(lm.mark_read(recipient, n.id).await, Err(Error::NotFound(_))));
  assert!(matches!(lm.soft_delete(recipient, n.id).await, Err(Error::NotFound(_))));
}

// ─── Delivery ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_delivery_updates_requested_channel() {
  let (s, lm) = manager().await;
  let recipient = Uuid::new_v4();
  let methods = DeliveryMethods::from([DeliveryChannel::InApp, DeliveryChannel::Email]);
  let n = s.create(note(recipient, "mail").channels(methods)).await.unwrap();

  let failed = lm
    .record_delivery(n.id, DeliveryChannel::Email, DeliveryOutcome::Failed("mailbox full".into()))
    .await
    .unwrap();
  assert!(failed.delivery_status.email.is_failed());
  assert_eq!(failed.delivery_status.email.failure_reason.as_deref(), Some("mailbox full"));

  let delivered = lm
    .record_delivery(n.id, DeliveryChannel::Email, DeliveryOutcome::Delivered)
    .await
    .unwrap();
  assert!(delivered.delivery_status.email.delivered);
  assert!(delivered.delivery_status.email.failure_reason.is_none());

  // Once delivered, a late failure report changes nothing.
  let late = lm
    .record_delivery(n.id, DeliveryChannel::Email, DeliveryOutcome::Failed("bounce".into()))
    .await
    .unwrap();
  assert_eq!(late.delivery_status, delivered.delivery_status);

  let stored = s.find_by_id(n.id, recipient).await.unwrap().unwrap();
  assert_eq!(stored.delivery_status, delivered.delivery_status);
}

#[tokio::test]
async fn record_delivery_rejects_unrequested_channel() {
  let (s, lm) = manager().await;
  let n = s.create(note(Uuid::new_v4(), "in-app only")).await.unwrap();

  let err = lm
    .record_delivery(n.id, DeliveryChannel::Sms, DeliveryOutcome::Delivered)
    .await
    .unwrap_err();
  assert_eq!(err.field(), Some("delivery_method"));

  let err = lm
    .record_delivery(Uuid::new_v4(), DeliveryChannel::InApp, DeliveryOutcome::Delivered)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}
