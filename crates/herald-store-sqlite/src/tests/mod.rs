//! Integration tests for `SqliteStore` and the core services running on top
//! of it, against an in-memory database.

use std::sync::Arc;

use herald_core::{
  directory::{StaticDirectory, UserSummary},
  notification::{Category, NewNotification, NotificationType},
};
use uuid::Uuid;

use crate::SqliteStore;

mod fanout;
mod lifecycle;
mod query;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store plus a directory of four users: one manager, two active
/// developers and one inactive developer.
struct Fixture {
  store:     Arc<SqliteStore>,
  directory: Arc<StaticDirectory>,
  alice:     Uuid,
  bob:       Uuid,
  carol:     Uuid,
  dave:      Uuid,
}

fn user(name: &str, role: &str, active: bool) -> UserSummary {
  UserSummary {
    user_id: Uuid::new_v4(),
    name: name.to_owned(),
    email: Some(format!("{}@example.com", name.to_lowercase())),
    role: role.to_owned(),
    active,
  }
}

async fn fixture() -> Fixture {
  let users = [
    user("Alice", "manager", true),
    user("Bob", "developer", true),
    user("Carol", "developer", true),
    user("Dave", "developer", false),
  ];
  let ids: Vec<Uuid> = users.iter().map(|u| u.user_id).collect();

  Fixture {
    store:     Arc::new(store().await),
    directory: Arc::new(StaticDirectory::new(users)),
    alice:     ids[0],
    bob:       ids[1],
    carol:     ids[2],
    dave:      ids[3],
  }
}

fn note(recipient: Uuid, title: &str) -> NewNotification {
  NewNotification::new(
    recipient,
    NotificationType::Info,
    Category::System,
    title,
    format!("{title} body"),
  )
}
