//! Repository traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `bookmarks-store-sqlite`). Higher layers depend on these abstractions, not on
//! any concrete backend. Every trait shares one error type through
//! [`StoreBackend`], so a single backend can implement all of them and be used
//! as a [`SocialStore`].
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  action::{Action, FeedItem, NewAction},
  session::Session,
  user::{
    Account, NewAccount, Profile, ProfileChanges, User, UserChanges, UserId,
    UserQuery,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// A uniqueness constraint a write would have violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
  Username,
  Email,
}

/// Parameters for [`ActionStore::recent_actions`].
#[derive(Debug, Clone, Default)]
pub struct ActionQuery {
  /// Restrict to these actors. `None` means any actor; an empty list matches
  /// nothing.
  pub actors:        Option<Vec<UserId>>,
  /// Never return actions by this user.
  pub exclude_actor: Option<UserId>,
  pub limit:         usize,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The error type shared by every repository trait of one backend.
pub trait StoreBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

/// Accounts: the `User` row together with its `Profile`.
pub trait UserStore: StoreBackend {
  /// Create a user, its empty profile and the `"new user"` action in a single
  /// transaction. Returns `Ok(Err(_))` when the username or e-mail is taken.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Result<Account, Conflict>, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Retrieve a user by exact username. Returns `None` if not found.
  fn get_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Whether `email` (compared case-insensitively) belongs to any user other
  /// than `except`.
  fn email_in_use<'a>(
    &'a self,
    email: &'a str,
    except: Option<UserId>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// List users ordered by username.
  fn list_users(
    &self,
    query: UserQuery,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply both subforms of a profile edit in one transaction.
  fn update_account(
    &self,
    id: UserId,
    user: UserChanges,
    profile: ProfileChanges,
  ) -> impl Future<Output = Result<Result<(User, Profile), Conflict>, Self::Error>>
  + Send
  + '_;

  /// Enable or disable an account. Returns `false` if the user does not exist.
  fn set_active(
    &self,
    id: UserId,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Stamp `last_login` with the current time.
  fn record_login(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

pub trait ProfileStore: StoreBackend {
  /// The profile owned by `id`. Returns `None` if the user does not exist.
  fn profile_for_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;
}

/// The directed follow graph.
pub trait GraphStore: StoreBackend {
  /// Insert the edge `from → to` unless it exists. Returns `true` if a new edge
  /// was created.
  fn follow(
    &self,
    from: UserId,
    to: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove the edge `from → to` if it exists. Returns `true` if an edge was
  /// removed.
  fn unfollow(
    &self,
    from: UserId,
    to: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_following(
    &self,
    from: UserId,
    to: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Ids of the users `id` follows. Empty when none (or when `id` is unknown).
  fn following_ids(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  /// Ids of the users following `id`. Empty when none.
  fn follower_ids(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;
}

/// The append-only activity log.
pub trait ActionStore: StoreBackend {
  /// Append an action. When `dedupe_since` is set and an action with the same
  /// actor, verb and target was recorded at or after it, nothing is written and
  /// `None` is returned. The check and the insert are atomic.
  fn record_action(
    &self,
    input: NewAction,
    dedupe_since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Option<Action>, Self::Error>> + Send + '_;

  /// Most recent actions first, each joined with its actor and target
  /// summaries in the same read.
  fn recent_actions(
    &self,
    query: ActionQuery,
  ) -> impl Future<Output = Result<Vec<FeedItem>, Self::Error>> + Send + '_;
}

pub trait SessionStore: StoreBackend {
  fn create_session(
    &self,
    user_id: UserId,
    token_hash: String,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// The user owning an unexpired session. Returns `None` for unknown or
  /// expired tokens.
  fn session_user<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + 'a;

  /// Returns `true` if a session was removed.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

/// Everything the web layer needs from one backend.
pub trait SocialStore:
  UserStore + ProfileStore + GraphStore + ActionStore + SessionStore
{
}

impl<T> SocialStore for T where
  T: UserStore + ProfileStore + GraphStore + ActionStore + SessionStore
{
}
