//! Persisted login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// A server-side session row. The bearer token itself is never stored; only
/// its SHA-256 digest is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub token_hash: String,
  pub user_id:    UserId,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}
