//! The activity log.
//!
//! An action is an immutable record of something a user did. Actions are never
//! updated or deleted; the optional target is a weak `{kind, id}` reference
//! whose lifecycle the log does not own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  user::{UserId, UserSummary},
};

/// Verbs recorded by the application itself.
pub mod verb {
  /// Recorded once per account, inside the registration transaction.
  pub const NEW_USER: &str = "new user";
  /// Recorded when a follow edge is created.
  pub const USER_FOLLOWED: &str = "user followed";
}

/// Store-assigned numeric identity of an action.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActionId(pub i64);

impl fmt::Display for ActionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Targets ─────────────────────────────────────────────────────────────────

/// The kinds of entity an action may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
  User,
}

impl TargetKind {
  /// The discriminant string stored in the `target_kind` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::User => "user",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "user" => Ok(Self::User),
      other => Err(Error::UnknownTargetKind(other.to_owned())),
    }
  }
}

/// A tagged reference to the entity an action was performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionTarget {
  pub kind: TargetKind,
  pub id:   i64,
}

impl ActionTarget {
  pub fn user(id: UserId) -> Self { Self { kind: TargetKind::User, id: id.0 } }
}

/// A resolved target, looked up according to its [`TargetKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetSummary {
  User(UserSummary),
}

// ─── Action ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
  pub id:         ActionId,
  pub actor:      UserId,
  pub verb:       String,
  pub target:     Option<ActionTarget>,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ActionStore::record_action`].
#[derive(Debug, Clone)]
pub struct NewAction {
  pub actor:  UserId,
  pub verb:   String,
  pub target: Option<ActionTarget>,
}

impl NewAction {
  pub fn new(actor: UserId, verb: impl Into<String>) -> Self {
    Self { actor, verb: verb.into(), target: None }
  }

  pub fn with_target(mut self, target: ActionTarget) -> Self {
    self.target = Some(target);
    self
  }
}

/// An action together with everything needed to render it, loaded in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
  pub action: Action,
  pub actor:  UserSummary,
  /// `None` when the action has no target or the target no longer resolves.
  pub target: Option<TargetSummary>,
}

impl FeedItem {
  /// The target's display name, if it resolved.
  pub fn target_name(&self) -> Option<&str> {
    match &self.target {
      Some(TargetSummary::User(u)) => Some(&u.display_name),
      None => None,
    }
  }

  /// The username of a resolved user target.
  pub fn target_username(&self) -> Option<&str> {
    match &self.target {
      Some(TargetSummary::User(u)) => Some(&u.username),
      None => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn target_kind_roundtrips_through_discriminant() {
    assert_eq!(TargetKind::parse(TargetKind::User.as_str()).unwrap(), TargetKind::User);
    assert!(matches!(
      TargetKind::parse("image"),
      Err(Error::UnknownTargetKind(k)) if k == "image"
    ));
  }
}
