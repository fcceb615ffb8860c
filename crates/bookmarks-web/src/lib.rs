//! HTTP layer for Bookmarks.
//!
//! Exposes an axum [`Router`] serving the account pages, the follow endpoint
//! and uploaded media, backed by any [`SocialStore`].

pub mod accounts;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod media;
pub mod pages;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use bookmarks_core::{
  feed::{DEFAULT_FEED_LIMIT, EmptyFeed},
  store::SocialStore,
};
use chrono::TimeDelta;
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use handlers::{account, follow, users};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BOOKMARKS_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub database_path:      PathBuf,
  /// Root of uploaded files, served under `/media/`.
  pub media_dir:          PathBuf,
  pub session_ttl_hours:  u32,
  /// Mark the session cookie `Secure`; enable behind TLS.
  pub secure_cookies:     bool,
  pub feed_limit:         usize,
  /// What the dashboard shows a user who follows nobody.
  pub empty_feed:         EmptyFeed,
  /// Identical actions within this many seconds are recorded once. `0`
  /// disables deduplication.
  pub action_dedupe_secs: u32,
  pub max_photo_bytes:    usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8000,
      database_path:      PathBuf::from("bookmarks.sqlite3"),
      media_dir:          PathBuf::from("media"),
      session_ttl_hours:  24 * 14,
      secure_cookies:     false,
      feed_limit:         DEFAULT_FEED_LIMIT,
      empty_feed:         EmptyFeed::Discover,
      action_dedupe_secs: 60,
      max_photo_bytes:    5 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  pub fn session_ttl(&self) -> TimeDelta { TimeDelta::hours(i64::from(self.session_ttl_hours)) }

  pub fn dedupe_window(&self) -> Option<TimeDelta> {
    (self.action_dedupe_secs > 0)
      .then(|| TimeDelta::seconds(i64::from(self.action_dedupe_secs)))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: SocialStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the site.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SocialStore + Clone + 'static,
{
  // Leave room for the text fields so oversized photos reach form validation.
  let body_limit = state.config.max_photo_bytes.saturating_mul(2) + 1024 * 1024;
  let media = ServeDir::new(&state.config.media_dir);

  Router::new()
    .route("/",                           get(handlers::root))
    .route("/account/",                   get(account::dashboard::<S>))
    .route("/account/login/",             get(account::login_form).post(account::login::<S>))
    .route("/account/logout/",            get(account::logout::<S>).post(account::logout::<S>))
    .route("/account/register/",          get(account::register_form).post(account::register::<S>))
    .route("/account/edit/",              get(account::edit_form::<S>).post(account::edit::<S>))
    .route("/account/users/",             get(users::list::<S>))
    .route("/account/users/{username}/",  get(users::detail::<S>))
    .route("/account/follow/",            post(follow::handler::<S>))
    .nest_service("/media", media)
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
