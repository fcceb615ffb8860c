//! The dashboard feed composer.
//!
//! The feed is the one read that combines two stores: the follow graph decides
//! whose actions are eligible and the action log supplies them, newest first.

use chrono::{TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  action::{Action, FeedItem, NewAction},
  store::{ActionQuery, ActionStore, GraphStore},
  user::UserId,
};

/// Number of actions shown on the dashboard.
pub const DEFAULT_FEED_LIMIT: usize = 10;

/// What the feed shows when the viewer follows nobody.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyFeed {
  /// Recent actions by everyone except the viewer.
  #[default]
  Discover,
  /// No actions at all.
  Nothing,
}

/// Select the viewer's feed: recent actions by followed users, never the
/// viewer's own, ordered newest first and truncated to `limit`.
pub async fn compose_feed<S>(
  store: &S,
  viewer: UserId,
  limit: usize,
  when_empty: EmptyFeed,
) -> Result<Vec<FeedItem>, S::Error>
where
  S: GraphStore + ActionStore,
{
  let following_ids = store.following_ids(viewer).await?;

  let actors = if following_ids.is_empty() {
    match when_empty {
      EmptyFeed::Discover => None,
      EmptyFeed::Nothing => return Ok(Vec::new()),
    }
  } else {
    Some(following_ids)
  };

  store
    .recent_actions(ActionQuery { actors, exclude_actor: Some(viewer), limit })
    .await
}

/// Record an action unless an identical one was recorded within `window`.
pub async fn create_action<S>(
  store: &S,
  input: NewAction,
  window: Option<TimeDelta>,
) -> Result<Option<Action>, S::Error>
where
  S: ActionStore,
{
  let since = window.map(|w| Utc::now() - w);
  store.record_action(input, since).await
}
