use herald_core::{
  Error,
  directory::StaticDirectory,
  notification::{Category, NewNotification, NotificationType, Priority, RelatedEntity},
  query::{ListParams, QueryService},
  store::{NotificationStore, PageRequest, SortField, SortOrder},
};
use uuid::Uuid;

use super::{Fixture, fixture, note};
use crate::SqliteStore;

fn service(f: &Fixture) -> QueryService<SqliteStore, StaticDirectory> {
  QueryService::new(f.store.clone(), f.directory.clone())
}

fn typed(recipient: Uuid, kind: NotificationType, title: &str) -> NewNotification {
  NewNotification::new(recipient, kind, Category::Task, title, format!("{title} details"))
}

#[tokio::test]
async fn second_page_holds_the_remainder() {
  let f = fixture().await;
  for i in 0..25 {
    f.store.create(note(f.bob, &format!("note {i}"))).await.unwrap();
  }

  let page = service(&f)
    .list(f.bob, ListParams::default(), PageRequest::new(2, 20).unwrap())
    .await
    .unwrap();

  assert_eq!(page.items.len(), 5);
  assert_eq!(page.total, 25);
  assert_eq!(page.pages, 2);
  assert_eq!(page.page, 2);
  // Newest first: the last page holds the oldest records.
  assert_eq!(page.items.last().unwrap().notification.title, "note 0");
}

#[tokio::test]
async fn list_filters_and_sorts() {
  let f = fixture().await;
  f.store.create(typed(f.bob, NotificationType::Task, "b task")).await.unwrap();
  f.store.create(typed(f.bob, NotificationType::Project, "a project")).await.unwrap();
  f.store.create(typed(f.bob, NotificationType::Task, "a task")).await.unwrap();

  let params = ListParams {
    notification_type: Some(NotificationType::Task),
    sort_by: SortField::Title,
    sort_order: SortOrder::Asc,
    ..ListParams::default()
  };
  let page = service(&f).list(f.bob, params, PageRequest::default()).await.unwrap();
  let titles: Vec<&str> = page.items.iter().map(|v| v.notification.title.as_str()).collect();
  assert_eq!(titles, ["a task", "b task"]);
}

#[tokio::test]
async fn stats_count_by_type_and_priority() {
  let f = fixture().await;
  for i in 0..3 {
    f.store
      .create(typed(f.carol, NotificationType::Task, &format!("task {i}")))
      .await
      .unwrap();
  }
  for i in 0..2 {
    f.store
      .create(typed(f.carol, NotificationType::Project, &format!("project {i}")).priority(Priority::High))
      .await
      .unwrap();
  }

  let stats = service(&f).stats(f.carol).await.unwrap();
  assert_eq!(stats.total, 5);
  assert_eq!(stats.unread, 5);
  assert_eq!(stats.by_type.len(), 2);
  assert_eq!(stats.by_type[&NotificationType::Task], 3);
  assert_eq!(stats.by_type[&NotificationType::Project], 2);
  assert_eq!(stats.by_priority[&Priority::Medium], 3);
  assert_eq!(stats.by_priority[&Priority::High], 2);
}

#[tokio::test]
async fn unread_count_ignores_read_and_deleted() {
  let f = fixture().await;
  let mut ids = Vec::new();
  for i in 0..5 {
    ids.push(f.store.create(note(f.bob, &format!("n{i}"))).await.unwrap().id);
  }
  f.store.mark_read(ids[0], f.bob, chrono::Utc::now()).await.unwrap();
  f.store.soft_delete(ids[1], f.bob).await.unwrap();

  assert_eq!(service(&f).unread_count(f.bob).await.unwrap(), 3);
}

#[tokio::test]
async fn search_matches_title_or_message() {
  let f = fixture().await;
  f.store.create(note(f.bob, "Task assigned")).await.unwrap();
  f.store
    .create(NewNotification::new(
      f.bob,
      NotificationType::Info,
      Category::System,
      "Heads up",
      "Your TASK list is growing",
    ))
    .await
    .unwrap();
  f.store.create(note(f.bob, "Payroll ready")).await.unwrap();

  let page = service(&f).search(f.bob, "task", PageRequest::default()).await.unwrap();
  assert_eq!(page.total, 2);

  let err = service(&f).search(f.bob, "   ", PageRequest::default()).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn by_category_scopes_to_one_category() {
  let f = fixture().await;
  f.store.create(typed(f.bob, NotificationType::Task, "in task")).await.unwrap();
  f.store.create(note(f.bob, "in system")).await.unwrap();

  let page = service(&f)
    .by_category(f.bob, Category::System, PageRequest::default())
    .await
    .unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.items[0].notification.category, Category::System);
}

#[tokio::test]
async fn views_carry_sender_and_derived_fields() {
  let f = fixture().await;
  let n = f.store
    .create(note(f.bob, "urgent ping").sender(Some(f.alice)).priority(Priority::Urgent))
    .await
    .unwrap();

  let view = service(&f).get_by_id(f.bob, n.id).await.unwrap();
  assert!(view.is_urgent);
  assert!(!view.is_overdue);
  assert_eq!(view.time_ago, "Just now");
  assert_eq!(view.sender_info.unwrap().user_id, f.alice);

  let err = service(&f).get_by_id(f.carol, n.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn detail_resolves_related_user() {
  let f = fixture().await;
  let n = f.store
    .create(note(f.bob, "profile change").related(RelatedEntity::User(f.carol)))
    .await
    .unwrap();
  let plain = f.store.create(note(f.bob, "nothing related")).await.unwrap();

  let query = service(&f);
  let detail = query.detail(f.bob, n.id, f.directory.as_ref()).await.unwrap();
  assert_eq!(detail.related.map(|r| r.label).as_deref(), Some("Carol"));

  let detail = query.detail(f.bob, plain.id, f.directory.as_ref()).await.unwrap();
  assert!(detail.related.is_none());
}
