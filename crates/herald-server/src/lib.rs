//! Server wiring for Herald: configuration, store and directory setup, and
//! the top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use herald_core::{
  directory::{StaticDirectory, UserSummary},
  retention::RetentionPolicy,
};
use herald_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Deserialised from `config.toml` overlaid by `HERALD_*` environment
/// variables. Nested keys use a double underscore, e.g.
/// `HERALD_RETENTION__PURGE_AFTER_DAYS=30`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub retention:  RetentionPolicy,
  /// Seeds the in-process user directory.
  pub users:      Vec<UserSummary>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("herald.db"),
      retention:  RetentionPolicy::default(),
      users:      Vec::new(),
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path).required(false));
    Self::from_builder(builder)
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let builder = builder.add_source(
      config::Environment::with_prefix("HERALD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    );
    let cfg: Self = builder
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.retention.validate().context("invalid [retention] settings")?;
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Wiring ──────────────────────────────────────────────────────────────────

/// Open the store at the configured path with the configured retention.
pub async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok(store.with_retention(cfg.retention))
}

pub fn directory(cfg: &ServerConfig) -> StaticDirectory {
  StaticDirectory::new(cfg.users.iter().cloned())
}

/// The API mounted under `/api`, with request tracing.
pub fn app(store: Arc<SqliteStore>, directory: Arc<StaticDirectory>) -> Router {
  Router::new()
    .nest("/api", herald_api::api_router(store, directory))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use herald_api::auth::USER_ID_HEADER;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    let builder = config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml));
    ServerConfig::from_builder(builder).unwrap()
  }

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.retention, RetentionPolicy::default());
    assert!(cfg.users.is_empty());
  }

  #[test]
  fn users_and_retention_are_read() {
    let cfg = from_toml(
      r#"
        port = 9000

        [retention]
        purge_after_days = 14

        [[users]]
        user_id = "6f1c2a4e-0b9d-4c3e-8a57-2d4b1e9f0c11"
        name    = "Ada"
        email   = "ada@example.com"
        role    = "finance"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.retention.purge_after_days, 14);
    assert_eq!(cfg.retention.expire_after_days, 30);
    assert_eq!(cfg.users.len(), 1);
    assert_eq!(cfg.users[0].name, "Ada");
    assert!(cfg.users[0].active);
  }

  #[test]
  fn oversized_retention_is_rejected() {
    let builder = config::Config::builder().add_source(config::File::from_str(
      "[retention]\nexpire_after_days = 4000000000",
      config::FileFormat::Toml,
    ));
    let err = ServerConfig::from_builder(builder).unwrap_err();
    assert!(format!("{err:#}").contains("expire_after_days"));
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    let plain = Path::new("/var/lib/herald.db");
    assert_eq!(expand_tilde(plain), plain);
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/herald.db")), Path::new(&home).join("herald.db"));
    }
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let user = UserSummary {
      user_id: Uuid::new_v4(),
      name:    "Ada".into(),
      email:   None,
      role:    "finance".into(),
      active:  true,
    };
    let caller = user.user_id;
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let router = app(store, Arc::new(StaticDirectory::new([user])));

    let req = Request::builder()
      .uri("/api/notifications/unread-count")
      .header(USER_ID_HEADER, caller.to_string())
      .body(Body::empty())
      .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["count"], 0);

    let req = Request::builder().uri("/notifications").body(Body::empty()).unwrap();
    assert_eq!(router.oneshot(req).await.unwrap().status(), StatusCode::NOT_FOUND);
  }
}
