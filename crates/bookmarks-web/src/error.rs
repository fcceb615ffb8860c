//! Error types and axum `IntoResponse` implementation.

use axum::{
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::auth::LOGIN_URL;

#[derive(Debug, Error)]
pub enum Error {
  #[error("login required")]
  LoginRequired,
  #[error("not found")]
  NotFound,
  #[error("template error: {0}")]
  Template(#[from] askama::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("multipart error: {0}")]
  Multipart(#[from] MultipartError),
  #[error("password hashing error: {0}")]
  Password(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::LoginRequired => Redirect::to(LOGIN_URL).into_response(),
      Error::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
      Error::Multipart(e) => (e.status(), e.body_text()).into_response(),
      e @ (Error::Template(_) | Error::Io(_) | Error::Password(_) | Error::Store(_)) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
    }
  }
}
