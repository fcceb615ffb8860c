//! The follow graph: directed `user_from → user_to` edges.
//!
//! Edges have existence semantics only. Following twice leaves one edge and
//! unfollowing a missing edge is a no-op.

use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  Error,
  action::{ActionTarget, NewAction, verb},
  feed::create_action,
  store::{ActionStore, GraphStore, UserStore},
  user::UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
  Follow,
  Unfollow,
}

impl FromStr for FollowAction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "follow" => Ok(Self::Follow),
      "unfollow" => Ok(Self::Unfollow),
      other => Err(Error::UnknownFollowAction(other.to_owned())),
    }
  }
}

/// Why a follow/unfollow request did not go through.
#[derive(Debug, Error)]
pub enum FollowError<E> {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unknown target user: {0}")]
  UnknownTarget(UserId),

  #[error("users cannot follow themselves")]
  SelfFollow,

  #[error("store error: {0}")]
  Store(#[source] E),
}

/// A validated follow/unfollow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowRequest {
  pub target: UserId,
  pub action: FollowAction,
}

impl FollowRequest {
  /// Parse the raw `id` and `action` form values.
  pub fn parse<E>(
    id: Option<&str>,
    action: Option<&str>,
  ) -> Result<Self, FollowError<E>> {
    let id = id
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| FollowError::BadRequest("missing id".to_owned()))?;
    let action = action
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| FollowError::BadRequest("missing action".to_owned()))?;

    let target = id
      .parse::<i64>()
      .map(UserId)
      .map_err(|_| FollowError::BadRequest(format!("invalid id {id:?}")))?;
    let action = action
      .parse::<FollowAction>()
      .map_err(|e| FollowError::BadRequest(e.to_string()))?;

    Ok(Self { target, action })
  }
}

/// Apply a follow or unfollow by `follower`. Returns `true` if the graph
/// changed.
///
/// Only active users can be followed; an edge to a deactivated user can still
/// be removed. A newly created edge is announced with a `"user followed"`
/// action, subject to the `dedupe` window.
pub async fn set_follow_state<S>(
  store: &S,
  follower: UserId,
  request: FollowRequest,
  dedupe: Option<TimeDelta>,
) -> Result<bool, FollowError<S::Error>>
where
  S: UserStore + GraphStore + ActionStore,
{
  let FollowRequest { target, action } = request;

  if target == follower {
    return Err(FollowError::SelfFollow);
  }

  let user = store
    .get_user(target)
    .await
    .map_err(FollowError::Store)?
    .ok_or(FollowError::UnknownTarget(target))?;

  match action {
    FollowAction::Follow => {
      if !user.is_active {
        return Err(FollowError::UnknownTarget(target));
      }
      let created = store.follow(follower, target).await.map_err(FollowError::Store)?;
      if created {
        let input = NewAction::new(follower, verb::USER_FOLLOWED)
          .with_target(ActionTarget::user(target));
        create_action(store, input, dedupe)
          .await
          .map_err(FollowError::Store)?;
      }
      Ok(created)
    }
    FollowAction::Unfollow => {
      store.unfollow(follower, target).await.map_err(FollowError::Store)
    }
  }
}
