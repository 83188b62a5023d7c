//! JSON REST API for Herald.
//!
//! Exposes an axum [`Router`] backed by any [`NotificationStore`] and
//! [`UserDirectory`]. Authentication, TLS, and transport concerns are the
//! caller's responsibility; the authenticated user arrives in `x-user-id`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", herald_api::api_router(store.clone(), directory.clone()))
//! ```

pub mod auth;
pub mod broadcast;
pub mod error;
pub mod notifications;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use herald_core::{
  directory::UserDirectory,
  events::EventFactory,
  fanout::FanoutHelper,
  lifecycle::LifecycleManager,
  notification::EntityResolver,
  query::QueryService,
  store::NotificationStore,
};

pub use auth::Caller;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// The core services, shared by every handler.
pub struct AppState<S, D> {
  pub store:     Arc<S>,
  pub directory: Arc<D>,
}

impl<S, D> Clone for AppState<S, D> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), directory: self.directory.clone() }
  }
}

impl<S: NotificationStore, D: UserDirectory> AppState<S, D> {
  pub fn new(store: Arc<S>, directory: Arc<D>) -> Self { Self { store, directory } }

  pub fn lifecycle(&self) -> LifecycleManager<S> { LifecycleManager::new(self.store.clone()) }

  pub fn query(&self) -> QueryService<S, D> {
    QueryService::new(self.store.clone(), self.directory.clone())
  }

  pub fn events(&self) -> EventFactory<S, D> {
    EventFactory::new(self.store.clone(), self.directory.clone())
  }

  pub fn fanout(&self) -> FanoutHelper<S, D> {
    FanoutHelper::new(self.store.clone(), self.directory.clone())
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. The directory doubles as the resolver for related
/// entities on single-notification reads.
pub fn api_router<S, D>(store: Arc<S>, directory: Arc<D>) -> Router<()>
where
  S: NotificationStore + 'static,
  D: UserDirectory + EntityResolver + 'static,
{
  use notifications as n;

  Router::new()
    .route(
      "/notifications",
      get(n::list::<S, D>)
        .post(n::create::<S, D>)
        .delete(n::bulk_delete::<S, D>),
    )
    .route("/notifications/unread-count", get(n::unread_count::<S, D>))
    .route("/notifications/stats", get(n::stats::<S, D>))
    .route("/notifications/search", get(n::search::<S, D>))
    .route("/notifications/category/{category}", get(n::by_category::<S, D>))
    .route("/notifications/read-all", put(n::mark_all_read::<S, D>))
    .route(
      "/notifications/{id}",
      get(n::get_one::<S, D>)
        .patch(n::update::<S, D>)
        .delete(n::delete_one::<S, D>),
    )
    .route("/notifications/{id}/read", put(n::mark_read::<S, D>))
    .route("/notifications/{id}/unread", put(n::mark_unread::<S, D>))
    // Fan-out
    .route("/broadcast", post(broadcast::to_users::<S, D>))
    .route("/broadcast/role/{role}", post(broadcast::to_role::<S, D>))
    .with_state(AppState::new(store, directory))
}
