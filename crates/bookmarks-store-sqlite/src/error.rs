//! Error type for `bookmarks-store-sqlite`.

use bookmarks_core::{store::Conflict, user::UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] bookmarks_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("user not found: {0}")]
  UserNotFound(UserId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Map a UNIQUE violation on `users` to the field that collided.
pub(crate) fn user_conflict(err: &tokio_rusqlite::Error) -> Option<Conflict> {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, msg))
      if e.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      let msg = msg.as_deref().unwrap_or_default();
      if msg.contains("email") {
        Some(Conflict::Email)
      } else if msg.contains("username") {
        Some(Conflict::Username)
      } else {
        None
      }
    }
    _ => None,
  }
}
