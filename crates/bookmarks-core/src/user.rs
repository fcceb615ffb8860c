//! Users and their one-to-one profiles.
//!
//! A user is never hard-deleted; disabling an account flips `is_active`. Every
//! user owns exactly one [`Profile`], created in the same transaction.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned numeric identity of a user.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            UserId,
  pub username:      String,
  /// PHC string produced by argon2; never rendered.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  /// Empty when the user did not supply one.
  pub email:         String,
  pub is_active:     bool,
  pub is_staff:      bool,
  pub date_joined:   DateTime<Utc>,
  pub last_login:    Option<DateTime<Utc>>,
}

impl User {
  /// First and last name joined, falling back to the username.
  pub fn display_name(&self) -> String {
    display_name(&self.username, &self.first_name, &self.last_name)
  }
}

pub(crate) fn display_name(username: &str, first: &str, last: &str) -> String {
  let full = format!("{first} {last}");
  let full = full.trim();
  if full.is_empty() { username.to_owned() } else { full.to_owned() }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Extended, user-editable profile data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:       UserId,
  pub date_of_birth: Option<NaiveDate>,
  /// Path relative to the configured `media_dir`.
  pub photo:         Option<String>,
  pub bio:           String,
}

/// The identity and profile fields shown next to a feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub id:           UserId,
  pub username:     String,
  pub display_name: String,
  pub photo:        Option<String>,
}

impl UserSummary {
  pub fn new(
    id: UserId,
    username: String,
    first_name: &str,
    last_name: &str,
    photo: Option<String>,
  ) -> Self {
    let display_name = display_name(&username, first_name, last_name);
    Self { id, username, display_name, photo }
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::UserStore::create_account`].
/// `date_joined` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  pub password_hash: String,
  pub first_name:    String,
  pub email:         String,
  pub is_staff:      bool,
}

/// Everything written by a successful registration.
#[derive(Debug, Clone)]
pub struct Account {
  pub user:    User,
  pub profile: Profile,
  /// The `"new user"` action recorded alongside the account.
  pub action:  Action,
}

/// Replacement values for the user-identity subform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
  pub first_name: String,
  pub last_name:  String,
  pub email:      String,
}

/// Replacement values for the profile subform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
  pub date_of_birth: Option<NaiveDate>,
  pub bio:           String,
  /// `Some` replaces the stored photo; `None` keeps the current one.
  pub photo:         Option<String>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::UserStore::list_users`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserQuery {
  pub active_only:   bool,
  pub include_staff: bool,
}
