//! Integration tests for `SqliteStore` against an in-memory database.

use bookmarks_core::{
  action::{ActionTarget, NewAction, TargetKind, verb},
  directory::{self, member_detail},
  feed::{EmptyFeed, compose_feed, create_action},
  graph::{FollowAction, FollowError, FollowRequest, set_follow_state},
  store::{
    ActionQuery, ActionStore, Conflict, GraphStore, ProfileStore, SessionStore,
    UserStore,
  },
  user::{Account, NewAccount, ProfileChanges, UserChanges, UserId, UserQuery},
};
use chrono::{NaiveDate, TimeDelta, Utc};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_account(username: &str) -> NewAccount {
  NewAccount {
    username:      username.to_owned(),
    password_hash: "not-a-real-hash".to_owned(),
    first_name:    String::new(),
    email:         format!("{username}@example.com"),
    is_staff:      false,
  }
}

async fn register(s: &SqliteStore, username: &str) -> Account {
  s.create_account(new_account(username))
    .await
    .unwrap()
    .expect("username is free")
}

async fn all_actions(s: &SqliteStore) -> Vec<bookmarks_core::action::FeedItem> {
  s.recent_actions(ActionQuery { actors: None, exclude_actor: None, limit: 1000 })
    .await
    .unwrap()
}

fn follow(target: UserId) -> FollowRequest {
  FollowRequest { target, action: FollowAction::Follow }
}

fn unfollow(target: UserId) -> FollowRequest {
  FollowRequest { target, action: FollowAction::Unfollow }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_account_writes_user_profile_and_action() {
  let s = store().await;
  let account = register(&s, "alice").await;

  assert_eq!(account.user.username, "alice");
  assert!(account.user.is_active);
  assert!(account.user.last_login.is_none());
  assert_eq!(account.profile.user_id, account.user.id);
  assert_eq!(account.action.verb, verb::NEW_USER);
  assert_eq!(account.action.actor, account.user.id);
  assert!(account.action.target.is_none());
  assert_eq!(account.action.created_at, account.user.date_joined);

  let fetched = s.get_user(account.user.id).await.unwrap().unwrap();
  assert_eq!(fetched.username, "alice");
  assert_eq!(fetched.date_joined, account.user.date_joined);

  let profile = s.profile_for_user(account.user.id).await.unwrap().unwrap();
  assert_eq!(profile, account.profile);

  let actions = all_actions(&s).await;
  assert_eq!(actions.len(), 1);
  assert_eq!(actions[0].action, account.action);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
  let s = store().await;
  register(&s, "alice").await;

  let mut again = new_account("alice");
  again.email = "other@example.com".to_owned();
  let result = s.create_account(again).await.unwrap();
  assert!(matches!(result, Err(Conflict::Username)));

  // The failed registration left nothing behind.
  assert_eq!(all_actions(&s).await.len(), 1);
  let users = s.list_users(UserQuery::default()).await.unwrap();
  assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_regardless_of_case() {
  let s = store().await;
  register(&s, "alice").await;

  let mut bob = new_account("bob");
  bob.email = "ALICE@example.com".to_owned();
  let result = s.create_account(bob).await.unwrap();
  assert!(matches!(result, Err(Conflict::Email)));
  assert_eq!(all_actions(&s).await.len(), 1);
}

#[tokio::test]
async fn blank_emails_never_conflict() {
  let s = store().await;
  for name in ["alice", "bob"] {
    let mut input = new_account(name);
    input.email = String::new();
    assert!(s.create_account(input).await.unwrap().is_ok());
  }
  assert!(!s.email_in_use("", None).await.unwrap());
}

#[tokio::test]
async fn get_user_by_username_missing_returns_none() {
  let s = store().await;
  register(&s, "alice").await;

  assert!(s.get_user_by_username("alice").await.unwrap().is_some());
  assert!(s.get_user_by_username("Alice").await.unwrap().is_none());
  assert!(s.get_user_by_username("nobody").await.unwrap().is_none());
  assert!(s.get_user(UserId(999)).await.unwrap().is_none());
}

#[tokio::test]
async fn email_in_use_ignores_the_excepted_user() {
  let s = store().await;
  let alice = register(&s, "alice").await;

  assert!(s.email_in_use("alice@example.com", None).await.unwrap());
  assert!(s.email_in_use("Alice@Example.com", None).await.unwrap());
  assert!(!s.email_in_use("alice@example.com", Some(alice.user.id)).await.unwrap());
  assert!(!s.email_in_use("carol@example.com", None).await.unwrap());
}

#[tokio::test]
async fn list_users_filters_inactive_and_staff() {
  let s = store().await;
  register(&s, "carol").await;
  let bob = register(&s, "bob").await;
  register(&s, "alice").await;
  let mut admin = new_account("admin");
  admin.is_staff = true;
  s.create_account(admin).await.unwrap().unwrap();

  assert!(s.set_active(bob.user.id, false).await.unwrap());
  assert!(!s.set_active(UserId(999), false).await.unwrap());

  let everyone = s
    .list_users(UserQuery { active_only: false, include_staff: true })
    .await
    .unwrap();
  let names: Vec<_> = everyone.iter().map(|u| u.username.as_str()).collect();
  assert_eq!(names, ["admin", "alice", "bob", "carol"]);

  let members = directory::list_users(&s).await.unwrap();
  let names: Vec<_> = members.iter().map(|u| u.username.as_str()).collect();
  assert_eq!(names, ["alice", "carol"]);

  assert!(directory::get_user(&s, "bob").await.unwrap().is_none());
  assert!(directory::get_user(&s, "alice").await.unwrap().is_some());
}

#[tokio::test]
async fn record_login_stamps_last_login() {
  let s = store().await;
  let alice = register(&s, "alice").await;

  s.record_login(alice.user.id).await.unwrap();
  let fetched = s.get_user(alice.user.id).await.unwrap().unwrap();
  assert!(fetched.last_login.is_some());
}

// ─── Profile edits ───────────────────────────────────────────────────────────

#[tokio::test]
async fn update_account_applies_both_subforms() {
  let s = store().await;
  let alice = register(&s, "alice").await;
  let dob = NaiveDate::from_ymd_opt(1990, 4, 1).unwrap();

  let (user, profile) = s
    .update_account(
      alice.user.id,
      UserChanges {
        first_name: "Alice".to_owned(),
        last_name:  "Liddell".to_owned(),
        email:      "alice@wonderland.test".to_owned(),
      },
      ProfileChanges {
        date_of_birth: Some(dob),
        bio:           "Curiouser and curiouser".to_owned(),
        photo:         Some("users/2024/01/02/abc.png".to_owned()),
      },
    )
    .await
    .unwrap()
    .unwrap();

  assert_eq!(user.display_name(), "Alice Liddell");
  assert_eq!(user.email, "alice@wonderland.test");
  assert_eq!(profile.date_of_birth, Some(dob));
  assert_eq!(profile.photo.as_deref(), Some("users/2024/01/02/abc.png"));

  let stored = s.profile_for_user(alice.user.id).await.unwrap().unwrap();
  assert_eq!(stored, profile);
}

#[tokio::test]
async fn update_account_without_photo_keeps_existing_one() {
  let s = store().await;
  let alice = register(&s, "alice").await;

  let with_photo = ProfileChanges {
    photo: Some("users/2024/01/02/abc.png".to_owned()),
    ..ProfileChanges::default()
  };
  s.update_account(alice.user.id, UserChanges::default(), with_photo)
    .await
    .unwrap()
    .unwrap();

  let (_, profile) = s
    .update_account(
      alice.user.id,
      UserChanges::default(),
      ProfileChanges { bio: "hi".to_owned(), ..ProfileChanges::default() },
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(profile.bio, "hi");
  assert_eq!(profile.photo.as_deref(), Some("users/2024/01/02/abc.png"));
}

#[tokio::test]
async fn update_account_email_conflict_changes_nothing() {
  let s = store().await;
  let alice = register(&s, "alice").await;
  register(&s, "bob").await;

  let result = s
    .update_account(
      alice.user.id,
      UserChanges {
        first_name: "Alice".to_owned(),
        last_name:  String::new(),
        email:      "bob@example.com".to_owned(),
      },
      ProfileChanges { bio: "changed".to_owned(), ..ProfileChanges::default() },
    )
    .await
    .unwrap();
  assert!(matches!(result, Err(Conflict::Email)));

  let user = s.get_user(alice.user.id).await.unwrap().unwrap();
  assert_eq!(user.first_name, "");
  assert_eq!(user.email, "alice@example.com");
  let profile = s.profile_for_user(alice.user.id).await.unwrap().unwrap();
  assert_eq!(profile.bio, "");
}

#[tokio::test]
async fn update_account_unknown_user_errors() {
  let s = store().await;
  let result = s
    .update_account(UserId(42), UserChanges::default(), ProfileChanges::default())
    .await;
  assert!(matches!(result, Err(Error::UserNotFound(UserId(42)))));
}

// ─── Follow graph ────────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_is_idempotent() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;

  assert!(s.follow(alice, bob).await.unwrap());
  assert!(!s.follow(alice, bob).await.unwrap());

  assert!(s.is_following(alice, bob).await.unwrap());
  assert!(!s.is_following(bob, alice).await.unwrap());
  assert_eq!(s.following_ids(alice).await.unwrap(), vec![bob]);
  assert_eq!(s.follower_ids(bob).await.unwrap(), vec![alice]);
  assert!(s.follower_ids(alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_without_edge_is_a_noop() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;

  assert!(!s.unfollow(alice, bob).await.unwrap());

  s.follow(alice, bob).await.unwrap();
  assert!(s.unfollow(alice, bob).await.unwrap());
  assert!(!s.is_following(alice, bob).await.unwrap());
  assert!(s.following_ids(alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_follow_state_records_one_action_per_new_edge() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  let window = Some(TimeDelta::seconds(60));

  assert!(set_follow_state(&s, alice, follow(bob), window).await.unwrap());
  assert!(!set_follow_state(&s, alice, follow(bob), window).await.unwrap());

  let followed: Vec<_> = all_actions(&s)
    .await
    .into_iter()
    .filter(|item| item.action.verb == verb::USER_FOLLOWED)
    .collect();
  assert_eq!(followed.len(), 1);
  assert_eq!(followed[0].action.actor, alice);
  assert_eq!(followed[0].action.target, Some(ActionTarget::user(bob)));

  // Unfollow then refollow inside the window: the edge returns, the
  // announcement does not.
  assert!(set_follow_state(&s, alice, unfollow(bob), window).await.unwrap());
  assert!(set_follow_state(&s, alice, follow(bob), window).await.unwrap());
  let followed = all_actions(&s)
    .await
    .into_iter()
    .filter(|item| item.action.verb == verb::USER_FOLLOWED)
    .count();
  assert_eq!(followed, 1);
}

#[tokio::test]
async fn set_follow_state_rejects_self_follow() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;

  let result = set_follow_state(&s, alice, follow(alice), None).await;
  assert!(matches!(result, Err(FollowError::SelfFollow)));
  assert!(s.following_ids(alice).await.unwrap().is_empty());

  // The schema refuses the edge as well.
  assert!(s.follow(alice, alice).await.is_err());
}

#[tokio::test]
async fn set_follow_state_unknown_target_writes_nothing() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  s.set_active(bob, false).await.unwrap();

  for target in [UserId(999), bob] {
    let result = set_follow_state(&s, alice, follow(target), None).await;
    assert!(matches!(result, Err(FollowError::UnknownTarget(id)) if id == target));
  }

  assert!(s.following_ids(alice).await.unwrap().is_empty());
  assert!(
    !all_actions(&s)
      .await
      .iter()
      .any(|item| item.action.verb == verb::USER_FOLLOWED)
  );
}

#[tokio::test]
async fn unfollow_of_deactivated_user_removes_the_edge() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;

  assert!(set_follow_state(&s, alice, follow(bob), None).await.unwrap());
  s.set_active(bob, false).await.unwrap();

  assert!(set_follow_state(&s, alice, unfollow(bob), None).await.unwrap());
  assert!(s.following_ids(alice).await.unwrap().is_empty());

  // Repeating it is a no-op, not an error.
  assert!(!set_follow_state(&s, alice, unfollow(bob), None).await.unwrap());

  let result = set_follow_state(&s, alice, unfollow(UserId(999)), None).await;
  assert!(matches!(result, Err(FollowError::UnknownTarget(UserId(999)))));
}

// ─── Actions ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_action_dedupes_within_window() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  let input = NewAction::new(alice, "bookmark").with_target(ActionTarget::user(bob));
  let window = Some(TimeDelta::seconds(60));

  let first = create_action(&s, input.clone(), window).await.unwrap();
  assert!(first.is_some());
  let second = create_action(&s, input.clone(), window).await.unwrap();
  assert!(second.is_none());

  // A different target is a different action.
  let other = NewAction::new(alice, "bookmark");
  assert!(create_action(&s, other, window).await.unwrap().is_some());

  // Without a window nothing is deduplicated.
  assert!(create_action(&s, input, None).await.unwrap().is_some());

  let bookmarks = all_actions(&s)
    .await
    .into_iter()
    .filter(|item| item.action.verb == "bookmark")
    .count();
  assert_eq!(bookmarks, 3);
}

#[tokio::test]
async fn record_action_outside_window_is_kept() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let input = NewAction::new(alice, "bookmark");

  s.record_action(input.clone(), None).await.unwrap();
  let since = Utc::now() + TimeDelta::seconds(1);
  assert!(s.record_action(input, Some(since)).await.unwrap().is_some());
}

#[tokio::test]
async fn recent_actions_joins_actor_and_target_summaries() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await;
  s.update_account(
    bob.user.id,
    UserChanges {
      first_name: "Bob".to_owned(),
      last_name:  "Builder".to_owned(),
      email:      "bob@example.com".to_owned(),
    },
    ProfileChanges {
      photo: Some("users/2024/05/06/bob.jpg".to_owned()),
      ..ProfileChanges::default()
    },
  )
  .await
  .unwrap()
  .unwrap();

  set_follow_state(&s, alice, follow(bob.user.id), None).await.unwrap();

  let items = s
    .recent_actions(ActionQuery {
      actors:        Some(vec![alice]),
      exclude_actor: None,
      limit:         1,
    })
    .await
    .unwrap();
  assert_eq!(items.len(), 1);
  let item = &items[0];
  assert_eq!(item.action.verb, verb::USER_FOLLOWED);
  assert_eq!(item.actor.username, "alice");
  assert_eq!(item.target_username(), Some("bob"));
  assert_eq!(item.target_name(), Some("Bob Builder"));
  let Some(bookmarks_core::action::TargetSummary::User(target)) = &item.target else {
    panic!("expected a user target");
  };
  assert_eq!(target.photo.as_deref(), Some("users/2024/05/06/bob.jpg"));
  assert_eq!(item.action.target.map(|t| t.kind), Some(TargetKind::User));
}

#[tokio::test]
async fn recent_actions_with_empty_actor_list_matches_nothing() {
  let s = store().await;
  register(&s, "alice").await;

  let items = s
    .recent_actions(ActionQuery {
      actors:        Some(Vec::new()),
      exclude_actor: None,
      limit:         10,
    })
    .await
    .unwrap();
  assert!(items.is_empty());
}

#[tokio::test]
async fn recent_actions_skip_deactivated_actors() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  set_follow_state(&s, bob, follow(alice), None).await.unwrap();
  s.set_active(bob, false).await.unwrap();

  let actors: Vec<_> = all_actions(&s)
    .await
    .into_iter()
    .map(|item| item.actor.username)
    .collect();
  assert_eq!(actors, vec!["alice".to_owned()]);

  let feed = s
    .recent_actions(ActionQuery {
      actors:        Some(vec![bob]),
      exclude_actor: None,
      limit:         10,
    })
    .await
    .unwrap();
  assert!(feed.is_empty());
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_shows_only_followed_users_newest_first() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  let carol = register(&s, "carol").await.user.id;
  register(&s, "dave").await;

  set_follow_state(&s, alice, follow(bob), None).await.unwrap();
  set_follow_state(&s, bob, follow(carol), None).await.unwrap();

  let feed = compose_feed(&s, alice, 10, EmptyFeed::Discover).await.unwrap();
  let summary: Vec<_> = feed
    .iter()
    .map(|item| (item.actor.username.as_str(), item.action.verb.as_str()))
    .collect();
  assert_eq!(summary, [("bob", verb::USER_FOLLOWED), ("bob", verb::NEW_USER)]);

  assert!(feed.iter().all(|item| item.action.actor != alice));
  assert!(
    feed
      .windows(2)
      .all(|w| w[0].action.created_at >= w[1].action.created_at)
  );
}

#[tokio::test]
async fn feed_is_truncated_to_limit() {
  let s = store().await;
  let viewer = register(&s, "viewer").await.user.id;
  for i in 0..12 {
    register(&s, &format!("user{i:02}")).await;
  }

  let feed = compose_feed(&s, viewer, 10, EmptyFeed::Discover).await.unwrap();
  assert_eq!(feed.len(), 10);
  assert_eq!(feed[0].actor.username, "user11");
  assert!(feed.iter().all(|item| item.action.actor != viewer));
}

#[tokio::test]
async fn empty_follow_set_discovers_or_shows_nothing() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  register(&s, "bob").await;

  let discover = compose_feed(&s, alice, 10, EmptyFeed::Discover).await.unwrap();
  assert_eq!(discover.len(), 1);
  assert_eq!(discover[0].actor.username, "bob");

  let nothing = compose_feed(&s, alice, 10, EmptyFeed::Nothing).await.unwrap();
  assert!(nothing.is_empty());
}

// ─── Directory ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn member_detail_counts_edges_and_lists_own_actions() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let bob = register(&s, "bob").await.user.id;
  let carol = register(&s, "carol").await.user.id;

  set_follow_state(&s, alice, follow(bob), None).await.unwrap();
  set_follow_state(&s, carol, follow(bob), None).await.unwrap();
  set_follow_state(&s, bob, follow(carol), None).await.unwrap();

  let detail = member_detail(&s, alice, "bob", 10).await.unwrap().unwrap();
  assert_eq!(detail.user.id, bob);
  assert_eq!(detail.follower_count, 2);
  assert_eq!(detail.following_count, 1);
  assert!(detail.viewer_follows);
  assert!(detail.recent.iter().all(|item| item.action.actor == bob));
  assert_eq!(detail.recent.len(), 2);

  let as_bob = member_detail(&s, bob, "alice", 10).await.unwrap().unwrap();
  assert!(!as_bob.viewer_follows);

  assert!(member_detail(&s, alice, "nobody", 10).await.unwrap().is_none());
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_lookup_respects_expiry() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let now = Utc::now();

  let session = s
    .create_session(alice, "digest-1".to_owned(), now + TimeDelta::hours(1))
    .await
    .unwrap();
  assert_eq!(session.user_id, alice);
  assert!(session.expires_at > now);

  assert_eq!(s.session_user("digest-1", now).await.unwrap(), Some(alice));
  assert_eq!(s.session_user("digest-2", now).await.unwrap(), None);
  assert_eq!(
    s.session_user("digest-1", now + TimeDelta::hours(2)).await.unwrap(),
    None
  );
}

#[tokio::test]
async fn delete_session_ends_it() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let expires = Utc::now() + TimeDelta::hours(1);

  s.create_session(alice, "digest".to_owned(), expires).await.unwrap();
  assert!(s.delete_session("digest").await.unwrap());
  assert!(!s.delete_session("digest").await.unwrap());
  assert_eq!(s.session_user("digest", Utc::now()).await.unwrap(), None);
}

#[tokio::test]
async fn creating_a_session_sweeps_expired_ones() {
  let s = store().await;
  let alice = register(&s, "alice").await.user.id;
  let past = Utc::now() - TimeDelta::hours(1);

  s.create_session(alice, "stale".to_owned(), past).await.unwrap();
  s.create_session(alice, "fresh".to_owned(), Utc::now() + TimeDelta::hours(1))
    .await
    .unwrap();

  // The stale row is gone, so deleting it reports nothing removed.
  assert!(!s.delete_session("stale").await.unwrap());
  assert!(s.delete_session("fresh").await.unwrap());
}
