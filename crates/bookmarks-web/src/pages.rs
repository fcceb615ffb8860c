//! Askama page templates.
//!
//! Every page extends `base.html`, which reads `section` to highlight the
//! active menu entry and `viewer` to decide between the member menu and the
//! login link.

use askama::Template;
use axum::response::Html;
use bookmarks_core::{
  action::FeedItem,
  directory::MemberDetail,
  forms::{FieldErrors, ProfileEditForm, RegistrationForm, UserEditForm},
  user::{Profile, User},
};

use crate::error::Error;

/// Render `page` into an HTML response body.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, Error> { Ok(Html(page.render()?)) }

/// A one-shot message shown at the top of a page.
#[derive(Debug, Clone, Copy)]
pub struct Notice {
  /// CSS class: `success` or `error`.
  pub level: &'static str,
  pub text:  &'static str,
}

impl Notice {
  pub const fn success(text: &'static str) -> Self { Self { level: "success", text } }

  pub const fn error(text: &'static str) -> Self { Self { level: "error", text } }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
  pub feed:    &'a [FeedItem],
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
}

#[derive(Template)]
#[template(path = "logged_out.html")]
pub struct LoggedOutPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
  pub form:    &'a RegistrationForm,
  pub errors:  &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "register_done.html")]
pub struct RegisterDonePage<'a> {
  pub section:  &'static str,
  pub viewer:   Option<&'a User>,
  pub new_user: &'a User,
}

#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditPage<'a> {
  pub section:      &'static str,
  pub viewer:       Option<&'a User>,
  pub notice:       Option<Notice>,
  pub user_form:    &'a UserEditForm,
  pub profile_form: &'a ProfileEditForm,
  /// The stored photo, relative to `/media/`.
  pub photo:        Option<&'a str>,
  pub errors:       &'a FieldErrors,
}

#[derive(Template)]
#[template(path = "user_list.html")]
pub struct UserListPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
  pub users:   &'a [User],
}

#[derive(Template)]
#[template(path = "user_detail.html")]
pub struct UserDetailPage<'a> {
  pub section: &'static str,
  pub viewer:  Option<&'a User>,
  pub detail:  &'a MemberDetail,
}

impl UserDetailPage<'_> {
  pub fn profile(&self) -> &Profile { &self.detail.profile }

  /// Whether the page shows the viewer's own profile.
  pub fn is_self(&self) -> bool { self.viewer.is_some_and(|v| v.id == self.detail.user.id) }
}
