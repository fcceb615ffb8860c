//! Error types for `bookmarks-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown action target kind: {0:?}")]
  UnknownTargetKind(String),

  #[error("unknown follow action: {0:?}")]
  UnknownFollowAction(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
