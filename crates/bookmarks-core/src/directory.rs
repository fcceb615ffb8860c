//! Read-only member directory: the user list and per-user detail pages.

use crate::{
  action::FeedItem,
  store::{ActionQuery, ActionStore, GraphStore, ProfileStore, UserStore},
  user::{Profile, User, UserId, UserQuery},
};

/// Active, non-staff users ordered by username.
pub async fn list_users<S>(store: &S) -> Result<Vec<User>, S::Error>
where
  S: UserStore,
{
  store
    .list_users(UserQuery { active_only: true, include_staff: false })
    .await
}

/// An active user by username. Inactive accounts are reported as absent.
pub async fn get_user<S>(store: &S, username: &str) -> Result<Option<User>, S::Error>
where
  S: UserStore,
{
  Ok(
    store
      .get_user_by_username(username)
      .await?
      .filter(|u| u.is_active),
  )
}

/// Everything shown on a user's detail page.
#[derive(Debug, Clone)]
pub struct MemberDetail {
  pub user:            User,
  pub profile:         Profile,
  pub follower_count:  usize,
  pub following_count: usize,
  /// Whether the viewing user follows this member.
  pub viewer_follows:  bool,
  /// The member's own most recent actions.
  pub recent:          Vec<FeedItem>,
}

/// Assemble the detail page for `username` as seen by `viewer`. Returns `None`
/// for unknown or inactive users.
pub async fn member_detail<S>(
  store: &S,
  viewer: UserId,
  username: &str,
  recent_limit: usize,
) -> Result<Option<MemberDetail>, S::Error>
where
  S: UserStore + ProfileStore + GraphStore + ActionStore,
{
  let Some(user) = get_user(store, username).await? else {
    return Ok(None);
  };

  let profile = store
    .profile_for_user(user.id)
    .await?
    .unwrap_or_else(|| Profile { user_id: user.id, ..Profile::default() });
  let follower_count = store.follower_ids(user.id).await?.len();
  let following_count = store.following_ids(user.id).await?.len();
  let viewer_follows = store.is_following(viewer, user.id).await?;
  let recent = store
    .recent_actions(ActionQuery {
      actors:        Some(vec![user.id]),
      exclude_actor: None,
      limit:         recent_limit,
    })
    .await?;

  Ok(Some(MemberDetail {
    user,
    profile,
    follower_count,
    following_count,
    viewer_follows,
    recent,
  }))
}
