use herald_core::{
  directory::StaticDirectory,
  fanout::{FanoutHelper, NotificationTemplate},
  notification::{Category, NewNotification, NotificationType, Priority},
  store::{NotificationFilter, NotificationStore},
};
use uuid::Uuid;

use super::{Fixture, fixture};
use crate::SqliteStore;

fn helper(f: &Fixture) -> FanoutHelper<SqliteStore, StaticDirectory> {
  FanoutHelper::new(f.store.clone(), f.directory.clone())
}

fn announcement() -> NotificationTemplate {
  NewNotification::new(
    Uuid::nil(),
    NotificationType::Info,
    Category::Team,
    "Team offsite",
    "The quarterly offsite is confirmed for next Friday",
  )
  .priority(Priority::Low)
  .into()
}

async fn total(f: &Fixture, recipient: Uuid) -> u64 {
  f.store.count(NotificationFilter::for_recipient(recipient)).await.unwrap()
}

#[tokio::test]
async fn notify_many_creates_one_record_per_distinct_recipient() {
  let f = fixture().await;
  let created = helper(&f)
    .notify_many(vec![f.bob, f.carol, f.bob], announcement())
    .await
    .unwrap();

  assert_eq!(created.len(), 2);
  assert_eq!(total(&f, f.bob).await, 1);
  assert_eq!(total(&f, f.carol).await, 1);
  assert!(created.iter().all(|n| n.title == "Team offsite"));
}

#[tokio::test]
async fn notify_many_with_unknown_recipient_writes_nothing() {
  let f = fixture().await;
  let err = helper(&f)
    .notify_many(vec![f.bob, Uuid::new_v4()], announcement())
    .await
    .unwrap_err();

  assert_eq!(err.field(), Some("recipient"));
  assert_eq!(total(&f, f.bob).await, 0);
}

#[tokio::test]
async fn storage_failure_mid_batch_leaves_no_records() {
  let f = fixture().await;
  f.store
    .conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER fail_third_insert BEFORE INSERT ON notifications
         WHEN (SELECT COUNT(*) FROM notifications) >= 2
         BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = helper(&f)
    .notify_many(vec![f.alice, f.bob, f.carol], announcement())
    .await
    .unwrap_err();

  assert!(matches!(err, herald_core::Error::Persistence(_)));
  for user in [f.alice, f.bob, f.carol] {
    assert_eq!(total(&f, user).await, 0);
  }
}

#[tokio::test]
async fn notify_by_role_reaches_active_holders_only() {
  let f = fixture().await;
  let created = helper(&f)
    .notify_by_role("Developer", announcement())
    .await
    .unwrap();

  let mut recipients: Vec<Uuid> = created.iter().map(|n| n.recipient).collect();
  recipients.sort();
  let mut expected = vec![f.bob, f.carol];
  expected.sort();
  assert_eq!(recipients, expected);
  assert_eq!(total(&f, f.dave).await, 0);
}

#[tokio::test]
async fn notify_by_role_without_holders_is_empty() {
  let f = fixture().await;
  let created = helper(&f).notify_by_role("auditor", announcement()).await.unwrap();
  assert!(created.is_empty());
}

#[tokio::test]
async fn notify_by_role_rejects_unknown_sender() {
  let f = fixture().await;
  let template = NotificationTemplate { sender: Some(Uuid::new_v4()), ..announcement() };

  let err = helper(&f).notify_by_role("developer", template).await.unwrap_err();
  assert_eq!(err.field(), Some("sender"));
  assert_eq!(total(&f, f.bob).await, 0);
  assert_eq!(total(&f, f.carol).await, 0);
}

#[tokio::test]
async fn fanout_futures_can_run_on_spawned_tasks() {
  let f = fixture().await;
  let template = NotificationTemplate { sender: Some(f.alice), ..announcement() };

  let many = tokio::spawn({
    let h = helper(&f);
    let (bob, carol) = (f.bob, f.carol);
    let template = template.clone();
    async move { h.notify_many(vec![bob, carol], template).await }
  });
  let by_role = tokio::spawn({
    let h = helper(&f);
    async move { h.notify_by_role("manager", template).await }
  });

  assert_eq!(many.await.unwrap().unwrap().len(), 2);
  // Alice is the only manager and also the sender; she still gets a copy.
  assert_eq!(by_role.await.unwrap().unwrap().len(), 1);
}
