//! Handlers for the account pages.
//!
//! | Method     | Path                 | Notes |
//! |------------|----------------------|-------|
//! | `GET`      | `/account/`          | Dashboard feed, login required |
//! | `GET/POST` | `/account/login/`    | Plain-text result on `POST` |
//! | `GET/POST` | `/account/logout/`   | Clears the session cookie |
//! | `GET/POST` | `/account/register/` | |
//! | `GET/POST` | `/account/edit/`     | Multipart `POST`, login required |

use axum::{
  Form,
  extract::{Multipart, State, rejection::FormRejection},
  http::{HeaderMap, header},
  response::{Html, IntoResponse, Response},
};
use bookmarks_core::{
  feed::compose_feed,
  forms::{FieldErrors, LoginForm, PhotoUpload, ProfileEditForm, RegistrationForm, UserEditForm},
  store::SocialStore,
  user::{Profile, User},
};
use bytes::Bytes;

use crate::{
  AppState, accounts,
  auth::{self, AuthError, Viewer},
  error::Error,
  pages::{
    self, DashboardPage, EditPage, LoggedOutPage, LoginPage, Notice, RegisterDonePage,
    RegisterPage,
  },
};

const LOGIN_OK: &str = "Authenticated successfully";
const INVALID_FORM: &str = "Invalid form";
const PROFILE_UPDATED: Notice = Notice::success("Profile updated successfully");
const PROFILE_INVALID: Notice = Notice::error("Error updating your profile");

// ─── Dashboard ────────────────────────────────────────────────────────────────

/// `GET /account/`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let feed = compose_feed(
    &*state.store,
    viewer.id,
    state.config.feed_limit,
    state.config.empty_feed,
  )
  .await
  .map_err(Error::store)?;

  pages::render(&DashboardPage { section: "dashboard", viewer: Some(&viewer), feed: &feed })
}

// ─── Login / logout ───────────────────────────────────────────────────────────

/// `GET /account/login/`
pub async fn login_form() -> Result<Html<String>, Error> {
  pages::render(&LoginPage { section: "", viewer: None })
}

/// `POST /account/login/`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, Error>
where
  S: SocialStore + Clone + 'static,
{
  let Ok(Form(form)) = form else {
    return Ok(INVALID_FORM.into_response());
  };
  let Ok((username, password)) = form.clean() else {
    return Ok(INVALID_FORM.into_response());
  };

  match auth::login(&*state.store, &username, &password).await {
    Ok(user) => {
      let cookie = auth::start_session(&*state.store, &state.config, user.id).await?;
      tracing::info!(user_id = %user.id, username = %user.username, "logged in");
      Ok(([(header::SET_COOKIE, cookie)], LOGIN_OK).into_response())
    }
    Err(AuthError::Store(e)) => Err(Error::Store(e)),
    Err(e) => {
      tracing::info!(username = %username, reason = %e, "login rejected");
      Ok(e.user_message().into_response())
    }
  }
}

/// `GET|POST /account/logout/` — succeeds with or without a session.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: SocialStore + Clone + 'static,
{
  let clear = auth::end_session(&*state.store, &headers).await?;
  let page = pages::render(&LoggedOutPage { section: "", viewer: None })?;
  Ok(([(header::SET_COOKIE, clear)], page).into_response())
}

// ─── Registration ─────────────────────────────────────────────────────────────

/// `GET /account/register/`
pub async fn register_form() -> Result<Html<String>, Error> {
  pages::render(&RegisterPage {
    section: "",
    viewer:  None,
    form:    &RegistrationForm::default(),
    errors:  &FieldErrors::new(),
  })
}

/// `POST /account/register/`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Form(form): Form<RegistrationForm>,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  match accounts::register(&*state.store, &form).await? {
    Ok(account) => pages::render(&RegisterDonePage {
      section:  "",
      viewer:   None,
      new_user: &account.user,
    }),
    Err(errors) => pages::render(&RegisterPage {
      section: "",
      viewer:  None,
      form:    &form,
      errors:  &errors,
    }),
  }
}

// ─── Profile edit ─────────────────────────────────────────────────────────────

/// Forms pre-filled with the stored values.
fn bound_forms(user: &User, profile: &Profile) -> (UserEditForm, ProfileEditForm) {
  let user_form = UserEditForm {
    first_name: user.first_name.clone(),
    last_name:  user.last_name.clone(),
    email:      user.email.clone(),
  };
  let profile_form = ProfileEditForm {
    date_of_birth: profile
      .date_of_birth
      .map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_default(),
    bio:           profile.bio.clone(),
    photo:         None,
  };
  (user_form, profile_form)
}

async fn stored_profile<S>(state: &AppState<S>, user: &User) -> Result<Profile, Error>
where
  S: SocialStore,
{
  Ok(
    state
      .store
      .profile_for_user(user.id)
      .await
      .map_err(Error::store)?
      .unwrap_or_else(|| Profile { user_id: user.id, ..Profile::default() }),
  )
}

/// `GET /account/edit/`
pub async fn edit_form<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let profile = stored_profile(&state, &viewer).await?;
  let (user_form, profile_form) = bound_forms(&viewer, &profile);

  pages::render(&EditPage {
    section:      "edit",
    viewer:       Some(&viewer),
    notice:       None,
    user_form:    &user_form,
    profile_form: &profile_form,
    photo:        profile.photo.as_deref(),
    errors:       &FieldErrors::new(),
  })
}

/// Read both subforms and the optional photo out of a multipart body.
async fn read_edit_forms(
  mut multipart: Multipart,
) -> Result<(UserEditForm, ProfileEditForm, Option<Bytes>), Error> {
  let mut user_form = UserEditForm::default();
  let mut profile_form = ProfileEditForm::default();
  let mut photo = None;

  while let Some(field) = multipart.next_field().await? {
    let Some(name) = field.name().map(str::to_owned) else {
      continue;
    };
    match name.as_str() {
      "first_name" => user_form.first_name = field.text().await?,
      "last_name" => user_form.last_name = field.text().await?,
      "email" => user_form.email = field.text().await?,
      "date_of_birth" => profile_form.date_of_birth = field.text().await?,
      "bio" => profile_form.bio = field.text().await?,
      "photo" => {
        let chose_file = field.file_name().is_some_and(|n| !n.is_empty());
        let data = field.bytes().await?;
        // Browsers send an empty part when no file was chosen.
        if !chose_file && data.is_empty() {
          continue;
        }
        profile_form.photo = Some(PhotoUpload::from_bytes(&data));
        photo = Some(data);
      }
      _ => {}
    }
  }

  Ok((user_form, profile_form, photo))
}

/// `POST /account/edit/`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  Viewer(viewer): Viewer,
  multipart: Multipart,
) -> Result<Html<String>, Error>
where
  S: SocialStore + Clone + 'static,
{
  let (user_form, profile_form, photo) = read_edit_forms(multipart).await?;

  let outcome = accounts::edit_profile(
    &*state.store,
    &state.config,
    &viewer,
    &user_form,
    &profile_form,
    photo,
  )
  .await?;

  match outcome {
    Ok((user, profile)) => {
      let (user_form, profile_form) = bound_forms(&user, &profile);
      pages::render(&EditPage {
        section:      "edit",
        viewer:       Some(&user),
        notice:       Some(PROFILE_UPDATED),
        user_form:    &user_form,
        profile_form: &profile_form,
        photo:        profile.photo.as_deref(),
        errors:       &FieldErrors::new(),
      })
    }
    Err(errors) => {
      tracing::debug!(user_id = %viewer.id, %errors, "profile edit rejected");
      let profile = stored_profile(&state, &viewer).await?;
      pages::render(&EditPage {
        section:      "edit",
        viewer:       Some(&viewer),
        notice:       Some(PROFILE_INVALID),
        user_form:    &user_form,
        profile_form: &profile_form,
        photo:        profile.photo.as_deref(),
        errors:       &errors,
      })
    }
  }
}
