pub mod account;
pub mod follow;
pub mod users;

use axum::response::Redirect;

/// `GET /` — the site lives under `/account/`.
pub async fn root() -> Redirect { Redirect::to("/account/") }
