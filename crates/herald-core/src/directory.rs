//! The user directory is an external collaborator used to validate recipients
//! and senders, attach sender identity to query results, and resolve roles
//! for fan-out.

use std::{collections::HashMap, convert::Infallible, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::EntityResolver;

/// The identity fields the notification core needs about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub user_id: Uuid,
  pub name:    String,
  #[serde(default)]
  pub email:   Option<String>,
  pub role:    String,
  #[serde(default = "default_active")]
  pub active:  bool,
}

fn default_active() -> bool { true }

/// Read-only access to the application's users.
pub trait UserDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a user by id. Returns `None` if not found.
  fn find_user_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserSummary>, Self::Error>> + Send + '_;

  /// All users holding `role`, active or not.
  fn find_users_by_role(
    &self,
    role: String,
  ) -> impl Future<Output = Result<Vec<UserSummary>, Self::Error>> + Send + '_;
}

// ─── Static directory ────────────────────────────────────────────────────────

/// An in-process directory over a fixed user list.
///
/// Seeded from configuration by the server binary and used as the fake
/// directory in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
  users: HashMap<Uuid, UserSummary>,
}

impl StaticDirectory {
  pub fn new(users: impl IntoIterator<Item = UserSummary>) -> Self {
    Self {
      users: users.into_iter().map(|u| (u.user_id, u)).collect(),
    }
  }

  pub fn insert(&mut self, user: UserSummary) {
    self.users.insert(user.user_id, user);
  }

  pub fn len(&self) -> usize { self.users.len() }

  pub fn is_empty(&self) -> bool { self.users.is_empty() }
}

impl UserDirectory for StaticDirectory {
  type Error = Infallible;

  async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserSummary>, Infallible> {
    Ok(self.users.get(&id).cloned())
  }

  async fn find_users_by_role(&self, role: String) -> Result<Vec<UserSummary>, Infallible> {
    let mut users: Vec<UserSummary> = self
      .users
      .values()
      .filter(|u| u.role.eq_ignore_ascii_case(&role))
      .cloned()
      .collect();
    users.sort_by(|a, b| a.name.cmp(&b.name).then(a.user_id.cmp(&b.user_id)));
    Ok(users)
  }
}

impl EntityResolver for StaticDirectory {
  type Error = Infallible;

  async fn user(&self, id: Uuid) -> Result<Option<String>, Infallible> {
    Ok(self.users.get(&id).map(|u| u.name.clone()))
  }
}
