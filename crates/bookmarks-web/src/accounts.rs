//! Registration and profile editing.
//!
//! Both operations validate every field before touching the store and
//! report problems as [`FieldErrors`] so the caller can re-render its form.
//! Uniqueness races that slip past the pre-checks come back from the store as
//! [`Conflict`]s and are reported the same way.

use bookmarks_core::{
  forms::{
    EMAIL_TAKEN, FieldErrors, ProfileEditForm, RegistrationForm, USERNAME_TAKEN,
    UserEditForm,
  },
  store::{Conflict, UserStore},
  user::{Account, NewAccount, Profile, User},
};
use bytes::Bytes;
use chrono::Utc;

use crate::{ServerConfig, auth::hash_password, error::Error, media::save_photo};

fn conflict_error(conflict: Conflict) -> FieldErrors {
  let mut errors = FieldErrors::new();
  match conflict {
    Conflict::Username => errors.add("username", USERNAME_TAKEN),
    Conflict::Email => errors.add("email", EMAIL_TAKEN),
  }
  errors
}

/// Register a regular member.
pub async fn register<S>(
  store: &S,
  form: &RegistrationForm,
) -> Result<Result<Account, FieldErrors>, Error>
where
  S: UserStore,
{
  register_as(store, form, false).await
}

/// Register an account, optionally with staff rights. The user, their empty
/// profile and the `"new user"` action are written together or not at all.
pub async fn register_as<S>(
  store: &S,
  form: &RegistrationForm,
  is_staff: bool,
) -> Result<Result<Account, FieldErrors>, Error>
where
  S: UserStore,
{
  let mut taken = FieldErrors::new();

  let username = form.username.trim();
  if !username.is_empty()
    && store
      .get_user_by_username(username)
      .await
      .map_err(Error::store)?
      .is_some()
  {
    taken.add("username", USERNAME_TAKEN);
  }

  let email = form.email.trim();
  if !email.is_empty() && store.email_in_use(email, None).await.map_err(Error::store)? {
    taken.add("email", EMAIL_TAKEN);
  }

  let clean = match form.clean() {
    Ok(clean) if taken.is_empty() => clean,
    Ok(_) => return Ok(Err(taken)),
    Err(mut errors) => {
      errors.merge(taken);
      return Ok(Err(errors));
    }
  };

  let input = NewAccount {
    password_hash: hash_password(&clean.password)?,
    username:      clean.username,
    first_name:    clean.first_name,
    email:         clean.email,
    is_staff,
  };

  match store.create_account(input).await.map_err(Error::store)? {
    Ok(account) => {
      tracing::info!(
        user_id = %account.user.id,
        username = %account.user.username,
        "registered new account"
      );
      Ok(Ok(account))
    }
    Err(conflict) => Ok(Err(conflict_error(conflict))),
  }
}

/// Apply both halves of the edit page for `user`. Nothing is saved unless
/// both subforms are valid; the photo (if any) is written to `media_dir`
/// before the single store transaction.
pub async fn edit_profile<S>(
  store: &S,
  config: &ServerConfig,
  user: &User,
  user_form: &UserEditForm,
  profile_form: &ProfileEditForm,
  photo: Option<Bytes>,
) -> Result<Result<(User, Profile), FieldErrors>, Error>
where
  S: UserStore,
{
  let user_result = user_form.clean();
  let profile_result = profile_form.clean(config.max_photo_bytes);

  let mut errors = FieldErrors::new();
  if let Ok(changes) = &user_result
    && !changes.email.is_empty()
    && store
      .email_in_use(&changes.email, Some(user.id))
      .await
      .map_err(Error::store)?
  {
    errors.add("email", EMAIL_TAKEN);
  }

  let (user_changes, clean_profile) = match (user_result, profile_result) {
    (Ok(u), Ok(p)) if errors.is_empty() => (u, p),
    (u, p) => {
      if let Err(e) = u {
        errors.merge(e);
      }
      if let Err(e) = p {
        errors.merge(e);
      }
      return Ok(Err(errors));
    }
  };

  let photo_path = match (clean_profile.photo_extension, photo) {
    (Some(ext), Some(bytes)) => {
      Some(save_photo(&config.media_dir, &bytes, ext, Utc::now()).await?)
    }
    _ => None,
  };

  let result = store
    .update_account(user.id, user_changes, clean_profile.into_changes(photo_path))
    .await
    .map_err(Error::store)?;

  Ok(match result {
    Ok(saved) => {
      tracing::info!(user_id = %user.id, "profile updated");
      Ok(saved)
    }
    Err(conflict) => Err(conflict_error(conflict)),
  })
}
