//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, microseconds)
//! so that lexical order in SQL equals chronological order. Dates are stored
//! as `YYYY-MM-DD`. Ids are plain integers.

use bookmarks_core::{
  action::{Action, ActionId, ActionTarget, FeedItem, TargetKind, TargetSummary},
  user::{Profile, User, UserId, UserSummary},
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Id lists ────────────────────────────────────────────────────────────────

/// JSON array consumed by `json_each(?)` in `IN (...)` filters.
pub fn encode_id_list(ids: &[UserId]) -> Result<String> {
  let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
  Ok(serde_json::to_string(&raw)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, username, password_hash, first_name, \
                                last_name, email, is_active, is_staff, \
                                date_joined, last_login";

/// Raw values read directly from a `users` row selected with
/// [`USER_COLUMNS`].
pub struct RawUser {
  pub user_id:       i64,
  pub username:      String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub is_active:     bool,
  pub is_staff:      bool,
  pub date_joined:   String,
  pub last_login:    Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      first_name:    row.get(3)?,
      last_name:     row.get(4)?,
      email:         row.get(5)?,
      is_active:     row.get(6)?,
      is_staff:      row.get(7)?,
      date_joined:   row.get(8)?,
      last_login:    row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            UserId(self.user_id),
      username:      self.username,
      password_hash: self.password_hash,
      first_name:    self.first_name,
      last_name:     self.last_name,
      email:         self.email,
      is_active:     self.is_active,
      is_staff:      self.is_staff,
      date_joined:   decode_dt(&self.date_joined)?,
      last_login:    self.last_login.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:       i64,
  pub date_of_birth: Option<String>,
  pub photo:         Option<String>,
  pub bio:           String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      date_of_birth: row.get(1)?,
      photo:         row.get(2)?,
      bio:           row.get(3)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:       UserId(self.user_id),
      date_of_birth: self.date_of_birth.as_deref().map(decode_date).transpose()?,
      photo:         self.photo,
      bio:           self.bio,
    })
  }
}

/// Raw values read directly from an `actions` row.
pub struct RawAction {
  pub action_id:   i64,
  pub user_id:     i64,
  pub verb:        String,
  pub target_kind: Option<String>,
  pub target_id:   Option<i64>,
  pub created_at:  String,
}

impl RawAction {
  pub fn into_action(self) -> Result<Action> {
    let target = match (self.target_kind, self.target_id) {
      (Some(kind), Some(id)) => Some(ActionTarget { kind: TargetKind::parse(&kind)?, id }),
      _ => None,
    };
    Ok(Action {
      id: ActionId(self.action_id),
      actor: UserId(self.user_id),
      verb: self.verb,
      target,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Columns of the joined feed read, in [`RawFeedRow::from_row`] order.
pub const FEED_COLUMNS: &str = "a.action_id, a.user_id, a.verb, a.target_kind, \
                                a.target_id, a.created_at, \
                                u.username, u.first_name, u.last_name, p.photo, \
                                tu.user_id, tu.username, tu.first_name, \
                                tu.last_name, tp.photo";

/// One action joined with its actor and (for user targets) the target user.
pub struct RawFeedRow {
  pub action:            RawAction,
  pub actor_username:    String,
  pub actor_first_name:  String,
  pub actor_last_name:   String,
  pub actor_photo:       Option<String>,
  // target join; all NULL when the target is absent or does not resolve
  pub target_user_id:    Option<i64>,
  pub target_username:   Option<String>,
  pub target_first_name: Option<String>,
  pub target_last_name:  Option<String>,
  pub target_photo:      Option<String>,
}

impl RawFeedRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      action:            RawAction {
        action_id:   row.get(0)?,
        user_id:     row.get(1)?,
        verb:        row.get(2)?,
        target_kind: row.get(3)?,
        target_id:   row.get(4)?,
        created_at:  row.get(5)?,
      },
      actor_username:    row.get(6)?,
      actor_first_name:  row.get(7)?,
      actor_last_name:   row.get(8)?,
      actor_photo:       row.get(9)?,
      target_user_id:    row.get(10)?,
      target_username:   row.get(11)?,
      target_first_name: row.get(12)?,
      target_last_name:  row.get(13)?,
      target_photo:      row.get(14)?,
    })
  }

  pub fn into_feed_item(self) -> Result<FeedItem> {
    let action = self.action.into_action()?;
    let actor = UserSummary::new(
      action.actor,
      self.actor_username,
      &self.actor_first_name,
      &self.actor_last_name,
      self.actor_photo,
    );

    let target = match (action.target, self.target_user_id, self.target_username) {
      (Some(ActionTarget { kind: TargetKind::User, .. }), Some(id), Some(username)) => {
        Some(TargetSummary::User(UserSummary::new(
          UserId(id),
          username,
          self.target_first_name.as_deref().unwrap_or_default(),
          self.target_last_name.as_deref().unwrap_or_default(),
          self.target_photo,
        )))
      }
      _ => None,
    };

    Ok(FeedItem { action, actor, target })
  }
}
