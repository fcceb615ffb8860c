//! `POST /account/follow/` — follow or unfollow another member.
//!
//! Form body: `id=<user id>&action=follow|unfollow`. Answers
//! `{"status":"ok"}` or `{"status":"error"}` with HTTP 200 either way; only
//! store failures become a 500.

use axum::{
  Form, Json,
  extract::{State, rejection::FormRejection},
};
use bookmarks_core::{
  graph::{FollowError, FollowRequest, set_follow_state},
  store::SocialStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::Viewer, error::Error};

#[derive(Debug, Default, Deserialize)]
pub struct FollowForm {
  pub id:     Option<String>,
  pub action: Option<String>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  form: Result<Form<FollowForm>, FormRejection>,
) -> Result<Json<Value>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let form = form.map(|Form(f)| f).unwrap_or_default();

  let result = match FollowRequest::parse(form.id.as_deref(), form.action.as_deref()) {
    Ok(request) => {
      set_follow_state(&*state.store, viewer.id, request, state.config.dedupe_window())
        .await
        .map(|changed| (request, changed))
    }
    Err(e) => Err(e),
  };

  match result {
    Ok((request, changed)) => {
      tracing::info!(
        user_id = %viewer.id,
        target = %request.target,
        action = ?request.action,
        changed,
        "follow state set"
      );
      Ok(Json(json!({ "status": "ok" })))
    }
    Err(FollowError::Store(e)) => Err(Error::store(e)),
    Err(e) => {
      tracing::debug!(user_id = %viewer.id, error = %e, "follow request rejected");
      Ok(Json(json!({ "status": "error" })))
    }
  }
}
