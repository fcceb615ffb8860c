//! Password login, cookie sessions and the [`Viewer`] extractor.
//!
//! A session token is 32 random bytes, base64url-encoded and handed to the
//! client in the `sessionid` cookie. The store only ever sees its SHA-256
//! digest.

use std::sync::LazyLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use bookmarks_core::{
  store::{SessionStore, SocialStore, UserStore},
  user::{User, UserId},
};
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::{AppState, ServerConfig, error::Error};

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_URL: &str = "/account/login/";

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Password(e.to_string()))
}

/// Check `password` against a PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// A throwaway hash checked when the username is unknown, so that every
/// login attempt pays for one argon2 verification.
static DUMMY_HASH: LazyLock<String> =
  LazyLock::new(|| hash_password("bookmarks-dummy-password").unwrap_or_default());

/// Verify `password` against `user`, or against [`DUMMY_HASH`] when there is
/// no such user. `None` never verifies.
fn check_password(user: Option<&User>, password: &str) -> bool {
  match user {
    Some(user) => verify_password(password, &user.password_hash),
    None => {
      verify_password(password, &DUMMY_HASH);
      false
    }
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("no such user")]
  UnknownUser,
  #[error("password does not match")]
  InvalidCredentials,
  #[error("account is disabled")]
  InactiveAccount,
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
  /// The text shown to the client. Unknown users and bad passwords are
  /// indistinguishable from the outside.
  pub fn user_message(&self) -> &'static str {
    match self {
      AuthError::UnknownUser | AuthError::InvalidCredentials => "Invalid login",
      AuthError::InactiveAccount => "Disabled account",
      AuthError::Store(_) => "Internal Server Error",
    }
  }
}

/// Authenticate `username` with `password`.
pub async fn login<S>(store: &S, username: &str, password: &str) -> Result<User, AuthError>
where
  S: UserStore,
{
  let user = store
    .get_user_by_username(username)
    .await
    .map_err(|e| AuthError::Store(Box::new(e)))?;

  let verified = check_password(user.as_ref(), password);
  let user = user.ok_or(AuthError::UnknownUser)?;
  if !verified {
    return Err(AuthError::InvalidCredentials);
  }
  if !user.is_active {
    return Err(AuthError::InactiveAccount);
  }
  Ok(user)
}

// ─── Sessions ────────────────────────────────────────────────────────────────

fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Open a session for `user_id` and stamp `last_login`. Returns the
/// `Set-Cookie` value carrying the new token.
pub async fn start_session<S>(
  store: &S,
  config: &ServerConfig,
  user_id: UserId,
) -> Result<String, Error>
where
  S: UserStore + SessionStore,
{
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  let token = B64.encode(bytes);

  let ttl = config.session_ttl();
  store
    .create_session(user_id, token_digest(&token), Utc::now() + ttl)
    .await
    .map_err(Error::store)?;
  store.record_login(user_id).await.map_err(Error::store)?;

  let secure = if config.secure_cookies { "; Secure" } else { "" };
  Ok(format!(
    "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure}",
    ttl.num_seconds()
  ))
}

/// Drop the session named by the request's cookie, if any. Returns the
/// `Set-Cookie` value that clears it on the client.
pub async fn end_session<S>(store: &S, headers: &HeaderMap) -> Result<String, Error>
where
  S: SessionStore,
{
  if let Some(token) = session_token(headers) {
    store
      .delete_session(&token_digest(token))
      .await
      .map_err(Error::store)?;
  }
  Ok(format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"))
}

/// The raw `sessionid` value from the `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value)
    .filter(|value| !value.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated, active user making the request.
#[derive(Debug, Clone)]
pub struct Viewer(pub User);

impl<S> FromRequestParts<AppState<S>> for Viewer
where
  S: SocialStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = session_token(&parts.headers).ok_or(Error::LoginRequired)?;

    let user_id = state
      .store
      .session_user(&token_digest(token), Utc::now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::LoginRequired)?;

    let user = state
      .store
      .get_user(user_id)
      .await
      .map_err(Error::store)?
      .filter(|u| u.is_active)
      .ok_or(Error::LoginRequired)?;

    Ok(Viewer(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn hashes_verify_only_their_password() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("battery staple", &hash));
  }

  #[test]
  fn malformed_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
    assert!(!verify_password("", ""));
  }

  #[test]
  fn session_token_is_read_from_any_cookie_header() {
    let mut headers = HeaderMap::new();
    headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
    headers.append(
      header::COOKIE,
      HeaderValue::from_static("csrftoken=x; sessionid=abc123; lang=en"),
    );
    assert_eq!(session_token(&headers), Some("abc123"));
  }

  #[test]
  fn missing_or_blank_session_cookie() {
    let mut headers = HeaderMap::new();
    assert_eq!(session_token(&headers), None);
    headers.insert(header::COOKIE, HeaderValue::from_static("sessionid="));
    assert_eq!(session_token(&headers), None);
    headers.insert(header::COOKIE, HeaderValue::from_static("xsessionid=abc"));
    assert_eq!(session_token(&headers), None);
  }

  #[test]
  fn digest_is_hex_sha256() {
    let digest = token_digest("token");
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(digest, token_digest("other"));
  }

  #[test]
  fn unknown_user_still_runs_a_real_verification() {
    assert!(PasswordHash::new(&DUMMY_HASH).is_ok());
    assert!(!check_password(None, "bookmarks-dummy-password"));
    assert!(!check_password(None, ""));
  }

  #[test]
  fn unknown_user_and_bad_password_share_a_message() {
    assert_eq!(AuthError::UnknownUser.user_message(), "Invalid login");
    assert_eq!(AuthError::InvalidCredentials.user_message(), "Invalid login");
    assert_eq!(AuthError::InactiveAccount.user_message(), "Disabled account");
  }
}
