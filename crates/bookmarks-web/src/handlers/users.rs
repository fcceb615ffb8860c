//! Handlers for the member directory.

use axum::{
  extract::{Path, State},
  response::Html,
};
use bookmarks_core::{directory, store::SocialStore};

use crate::{
  AppState,
  auth::Viewer,
  error::Error,
  pages::{self, UserDetailPage, UserListPage},
};

/// `GET /account/users/`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let users = directory::list_users(&*state.store)
    .await
    .map_err(Error::store)?;
  pages::render(&UserListPage { section: "people", viewer: Some(&viewer), users: &users })
}

/// `GET /account/users/{username}/` — 404 for unknown or inactive members.
pub async fn detail<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  Path(username): Path<String>,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let detail =
    directory::member_detail(&*state.store, viewer.id, &username, state.config.feed_limit)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound)?;

  pages::render(&UserDetailPage { section: "people", viewer: Some(&viewer), detail: &detail })
}
