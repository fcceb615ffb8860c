//! [`SqliteStore`] — the SQLite implementation of the Bookmarks stores.

use std::path::Path;

use bookmarks_core::{
  action::{Action, ActionId, FeedItem, NewAction, verb},
  session::Session,
  store::{
    ActionQuery, ActionStore, Conflict, GraphStore, ProfileStore, SessionStore,
    StoreBackend, UserStore,
  },
  user::{
    Account, NewAccount, Profile, ProfileChanges, User, UserChanges, UserId,
    UserQuery,
  },
};
use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{
    FEED_COLUMNS, RawFeedRow, RawProfile, RawUser, USER_COLUMNS, encode_date,
    encode_dt, encode_id_list,
  },
  error::user_conflict,
  schema::SCHEMA,
};

/// The current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bookmarks store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch one user row matching `condition` (a SQL fragment using `?1`).
  async fn user_where(
    &self,
    condition: &'static str,
    param: rusqlite::types::Value,
  ) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition}");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![param], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn ids_where(&self, sql: &'static str, id: UserId) -> Result<Vec<UserId>> {
    let ids: Vec<i64> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id.0], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids.into_iter().map(UserId).collect())
  }
}

impl StoreBackend for SqliteStore {
  type Error = Error;
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  async fn create_account(&self, input: NewAccount) -> Result<Result<Account, Conflict>> {
    let date_joined = now();
    let joined_str  = encode_dt(date_joined);

    let NewAccount { username, password_hash, first_name, email, is_staff } = input;
    let (username_p, hash_p, first_p, email_p) =
      (username.clone(), password_hash.clone(), first_name.clone(), email.clone());

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO users (username, password_hash, first_name, email, is_staff, date_joined)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![username_p, hash_p, first_p, email_p, is_staff, joined_str],
        )?;
        let user_id = tx.last_insert_rowid();

        tx.execute(
          "INSERT INTO profiles (user_id) VALUES (?1)",
          rusqlite::params![user_id],
        )?;

        tx.execute(
          "INSERT INTO actions (user_id, verb, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, verb::NEW_USER, joined_str],
        )?;
        let action_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok((user_id, action_id))
      })
      .await;

    let (user_id, action_id) = match result {
      Ok(ids) => ids,
      Err(e) => {
        return match user_conflict(&e) {
          Some(conflict) => Ok(Err(conflict)),
          None => Err(e.into()),
        };
      }
    };

    let user_id = UserId(user_id);
    let user = User {
      id: user_id,
      username,
      password_hash,
      first_name,
      last_name: String::new(),
      email,
      is_active: true,
      is_staff,
      date_joined,
      last_login: None,
    };
    let profile = Profile { user_id, ..Profile::default() };
    let action = Action {
      id:         ActionId(action_id),
      actor:      user_id,
      verb:       verb::NEW_USER.to_owned(),
      target:     None,
      created_at: date_joined,
    };

    Ok(Ok(Account { user, profile, action }))
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self.user_where("user_id = ?1", id.0.into()).await
  }

  async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self
      .user_where("username = ?1", username.to_owned().into())
      .await
  }

  async fn email_in_use(&self, email: &str, except: Option<UserId>) -> Result<bool> {
    if email.is_empty() {
      return Ok(false);
    }
    let email  = email.to_owned();
    let except = except.map(|id| id.0);

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM users
               WHERE email != '' AND lower(email) = lower(?1)
                 AND (?2 IS NULL OR user_id != ?2)
               LIMIT 1",
              rusqlite::params![email, except],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }

  async fn list_users(&self, query: UserQuery) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE (?1 = 0 OR is_active = 1)
             AND (?2 = 1 OR is_staff = 0)
           ORDER BY username"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![query.active_only, query.include_staff],
            RawUser::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_account(
    &self,
    id:      UserId,
    user:    UserChanges,
    profile: ProfileChanges,
  ) -> Result<Result<(User, Profile), Conflict>> {
    let dob_str = profile.date_of_birth.map(encode_date);

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE users SET first_name = ?2, last_name = ?3, email = ?4
           WHERE user_id = ?1",
          rusqlite::params![id.0, user.first_name, user.last_name, user.email],
        )?;
        if updated == 0 {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO profiles (user_id, date_of_birth, photo, bio)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (user_id) DO UPDATE SET
             date_of_birth = excluded.date_of_birth,
             photo         = COALESCE(excluded.photo, profiles.photo),
             bio           = excluded.bio",
          rusqlite::params![id.0, dob_str, profile.photo, profile.bio],
        )?;

        let raw_user = tx.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          rusqlite::params![id.0],
          RawUser::from_row,
        )?;
        let raw_profile = tx.query_row(
          "SELECT user_id, date_of_birth, photo, bio FROM profiles WHERE user_id = ?1",
          rusqlite::params![id.0],
          RawProfile::from_row,
        )?;

        tx.commit()?;
        Ok(Some((raw_user, raw_profile)))
      })
      .await;

    match result {
      Ok(Some((raw_user, raw_profile))) => {
        Ok(Ok((raw_user.into_user()?, raw_profile.into_profile()?)))
      }
      Ok(None) => Err(Error::UserNotFound(id)),
      Err(e) => match user_conflict(&e) {
        Some(conflict) => Ok(Err(conflict)),
        None => Err(e.into()),
      },
    }
  }

  async fn set_active(&self, id: UserId, active: bool) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
          rusqlite::params![id.0, active],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn record_login(&self, id: UserId) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET last_login = ?2 WHERE user_id = ?1",
          rusqlite::params![id.0, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  async fn profile_for_user(&self, id: UserId) -> Result<Option<Profile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, date_of_birth, photo, bio FROM profiles WHERE user_id = ?1",
              rusqlite::params![id.0],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  async fn follow(&self, from: UserId, to: UserId) -> Result<bool> {
    let at_str = encode_dt(Utc::now());
    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO contacts (user_from, user_to, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (user_from, user_to) DO NOTHING",
          rusqlite::params![from.0, to.0, at_str],
        )?)
      })
      .await?;
    Ok(inserted > 0)
  }

  async fn unfollow(&self, from: UserId, to: UserId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM contacts WHERE user_from = ?1 AND user_to = ?2",
          rusqlite::params![from.0, to.0],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn is_following(&self, from: UserId, to: UserId) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM contacts WHERE user_from = ?1 AND user_to = ?2",
              rusqlite::params![from.0, to.0],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(found)
  }

  async fn following_ids(&self, id: UserId) -> Result<Vec<UserId>> {
    self
      .ids_where(
        "SELECT user_to FROM contacts WHERE user_from = ?1 ORDER BY created_at",
        id,
      )
      .await
  }

  async fn follower_ids(&self, id: UserId) -> Result<Vec<UserId>> {
    self
      .ids_where(
        "SELECT user_from FROM contacts WHERE user_to = ?1 ORDER BY created_at",
        id,
      )
      .await
  }
}

// ─── ActionStore impl ────────────────────────────────────────────────────────

impl ActionStore for SqliteStore {
  async fn record_action(
    &self,
    input:        NewAction,
    dedupe_since: Option<DateTime<Utc>>,
  ) -> Result<Option<Action>> {
    let created_at  = now();
    let at_str      = encode_dt(created_at);
    let since_str   = dedupe_since.map(encode_dt);
    let actor       = input.actor.0;
    let verb        = input.verb.clone();
    let target_kind = input.target.map(|t| t.kind.as_str());
    let target_id   = input.target.map(|t| t.id);

    let action_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(since) = since_str {
          let similar = tx
            .query_row(
              "SELECT 1 FROM actions
               WHERE user_id = ?1 AND verb = ?2
                 AND target_kind IS ?3 AND target_id IS ?4
                 AND created_at >= ?5
               LIMIT 1",
              rusqlite::params![actor, verb, target_kind, target_id, since],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if similar {
            return Ok(None);
          }
        }

        tx.execute(
          "INSERT INTO actions (user_id, verb, target_kind, target_id, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![actor, verb, target_kind, target_id, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(action_id.map(|id| Action {
      id: ActionId(id),
      actor: input.actor,
      verb: input.verb,
      target: input.target,
      created_at,
    }))
  }

  async fn recent_actions(&self, query: ActionQuery) -> Result<Vec<FeedItem>> {
    let actors_json = query.actors.as_deref().map(encode_id_list).transpose()?;
    let exclude     = query.exclude_actor.map(|id| id.0);
    let limit       = i64::try_from(query.limit).unwrap_or(i64::MAX);

    let raws: Vec<RawFeedRow> = self
      .conn
      .call(move |conn| {
        // Actor and target summaries are joined in so that rendering the
        // feed needs no further reads.
        let sql = format!(
          "SELECT {FEED_COLUMNS}
           FROM actions a
           JOIN users u          ON u.user_id  = a.user_id
           LEFT JOIN profiles p  ON p.user_id  = a.user_id
           LEFT JOIN users tu    ON a.target_kind = 'user' AND tu.user_id = a.target_id
           LEFT JOIN profiles tp ON tp.user_id = tu.user_id
           WHERE u.is_active = 1
             AND (?1 IS NULL OR a.user_id IN (SELECT value FROM json_each(?1)))
             AND (?2 IS NULL OR a.user_id != ?2)
           ORDER BY a.created_at DESC, a.action_id DESC
           LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![actors_json, exclude, limit], RawFeedRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedRow::into_feed_item).collect()
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  async fn create_session(
    &self,
    user_id:    UserId,
    token_hash: String,
    expires_at: DateTime<Utc>,
  ) -> Result<Session> {
    let session = Session {
      token_hash,
      user_id,
      created_at: now(),
      expires_at: expires_at.trunc_subsecs(6),
    };

    let hash_str    = session.token_hash.clone();
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        // Expired rows are swept whenever a new session is issued.
        conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![created_str],
        )?;
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash_str, user_id.0, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn session_user(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserId>> {
    let hash_str = token_hash.to_owned();
    let now_str  = encode_dt(now);

    let user_id: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2",
              rusqlite::params![hash_str, now_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(user_id.map(UserId))
  }

  async fn delete_session(&self, token_hash: &str) -> Result<bool> {
    let hash_str = token_hash.to_owned();
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![hash_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }
}
