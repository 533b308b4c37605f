//! Circle operation tests: the client core end-to-end against the real
//! server, plus the pure capability computations on fetched rosters.

mod common;

use chrono::Utc;

use circles_client::{CircleClient, ClientError, RemovalOutcome, RenameOutcome};
use circles_types::authz::{Capabilities, compute_capabilities};
use circles_types::models::{AssignableRole, Circle, CircleMember, Role};
use common::*;

fn snapshot(name: &str, members: &[(i64, &str, Role)]) -> Circle {
    let now = Utc::now();
    Circle {
        id: 10,
        name: name.to_string(),
        description: None,
        owner_id: members
            .iter()
            .find(|(_, _, r)| *r == Role::Owner)
            .map(|(id, _, _)| *id)
            .unwrap_or(1),
        owner_name: None,
        members: members
            .iter()
            .map(|(id, username, role)| CircleMember {
                circle_id: 10,
                user_id: *id,
                username: (*username).to_string(),
                role: *role,
                joined_at: now,
            })
            .collect(),
        member_count: members.len(),
        created_at: now,
    }
}

#[tokio::test]
async fn member_capabilities_end_to_end() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (bob_api, _, bob) = signed_in_user(&server.base_url, "bob").await;

    let owner_ops = CircleClient::new(alice_api);
    let circle = owner_ops.create("Readers", None).await.expect("create");
    owner_ops.add_member(circle.id, bob.id).await.expect("add bob");

    // Bob loads the roster and derives his capabilities from it.
    let bob_ops = CircleClient::new(bob_api);
    let circle = bob_ops.fetch(circle.id).await.expect("fetch");
    let caps = compute_capabilities(Some(&circle), Some(&bob));

    assert!(!caps.is_owner);
    assert!(!caps.is_moderator);
    assert!(caps.is_member);
    assert!(!caps.can_manage_members);
    assert!(!caps.can_change_roles);
    assert!(!caps.can_change_settings);
    assert!(!caps.can_delete_circle);
}

#[tokio::test]
async fn promotion_updates_capabilities() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (bob_api, _, bob) = signed_in_user(&server.base_url, "bob").await;

    let owner_ops = CircleClient::new(alice_api);
    let circle = owner_ops.create("Readers", None).await.expect("create");
    owner_ops.add_member(circle.id, bob.id).await.expect("add bob");

    let updated = owner_ops
        .change_role(circle.id, bob.id, AssignableRole::Moderator)
        .await
        .expect("promote");
    assert_eq!(updated.role, Role::Moderator);

    // Fold the returned row into a fresh local snapshot...
    let local = owner_ops.fetch(circle.id).await.expect("fetch");
    let local = local.with_member_role(bob.id, updated.role);
    let caps = compute_capabilities(Some(&local), Some(&bob));
    assert!(caps.can_manage_members);
    assert!(!caps.can_change_roles);

    // ...and confirm the server agrees.
    let bob_ops = CircleClient::new(bob_api);
    let served = bob_ops.fetch(circle.id).await.expect("fetch as bob");
    let caps = compute_capabilities(Some(&served), Some(&bob));
    assert!(caps.can_manage_members);
    assert!(!caps.can_change_roles);
}

#[tokio::test]
async fn server_forbids_moderator_on_moderator_and_roster_stands() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (bob_api, _, bob) = signed_in_user(&server.base_url, "bob").await;
    let (_, _, carol) = signed_in_user(&server.base_url, "carol").await;

    let owner_ops = CircleClient::new(alice_api);
    let circle = owner_ops.create("Readers", None).await.expect("create");
    for id in [bob.id, carol.id] {
        owner_ops.add_member(circle.id, id).await.expect("add");
    }
    for id in [bob.id, carol.id] {
        owner_ops
            .change_role(circle.id, id, AssignableRole::Moderator)
            .await
            .expect("promote");
    }

    let bob_ops = CircleClient::new(bob_api);
    let roster = bob_ops.fetch(circle.id).await.expect("fetch");
    let carol_row = roster.member(carol.id).expect("carol on roster").clone();

    let err = bob_ops
        .remove_member(circle.id, &carol_row, |_| true)
        .await
        .expect_err("moderator on moderator must fail");
    assert!(matches!(err, ClientError::Forbidden(_)), "got {err:?}");
    assert_eq!(err.to_string(), "Moderators cannot remove other moderators");
    assert!(!err.is_retryable());

    // The 403 is authoritative: nothing changed server-side.
    let roster = bob_ops.fetch(circle.id).await.expect("re-fetch");
    assert_eq!(roster.member_count, 3);
    assert!(roster.member(carol.id).is_some());
}

#[tokio::test]
async fn removal_goes_through_the_confirmation_gate() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (_, _, bob) = signed_in_user(&server.base_url, "bob").await;

    let owner_ops = CircleClient::new(alice_api);
    let circle = owner_ops.create("Readers", None).await.expect("create");
    owner_ops.add_member(circle.id, bob.id).await.expect("add bob");
    let roster = owner_ops.fetch(circle.id).await.expect("fetch");
    let bob_row = roster.member(bob.id).expect("bob on roster").clone();

    // Declining the prompt sends nothing.
    let mut seen_prompt = String::new();
    let outcome = owner_ops
        .remove_member(circle.id, &bob_row, |prompt| {
            seen_prompt = prompt.to_string();
            false
        })
        .await
        .expect("declined removal is not an error");
    assert_eq!(outcome, RemovalOutcome::Cancelled);
    assert_eq!(seen_prompt, "Remove bob from circle?");
    assert_eq!(owner_ops.fetch(circle.id).await.unwrap().member_count, 2);

    // Confirming goes through; the caller derives a fresh snapshot.
    let outcome = owner_ops
        .remove_member(circle.id, &bob_row, |_| true)
        .await
        .expect("confirmed removal");
    assert_eq!(outcome, RemovalOutcome::Removed);
    let roster = roster.without_member(bob.id);
    assert_eq!(roster.member_count, 1);
    assert_eq!(owner_ops.fetch(circle.id).await.unwrap().member_count, 1);
}

#[tokio::test]
async fn owner_row_is_never_a_removal_target() {
    // Dead base URL: this must be decided without any network traffic.
    let ops = CircleClient::new(api(&dead_base_url()));
    let circle = snapshot("Readers", &[(1, "alice", Role::Owner), (2, "bob", Role::Member)]);
    let owner_row = circle.member(1).unwrap().clone();

    let err = ops
        .remove_member(circle.id, &owner_row, |_| panic!("owner row must not prompt"))
        .await
        .expect_err("owner removal is refused");
    assert!(matches!(err, ClientError::Forbidden(_)), "got {err:?}");
    assert_eq!(err.to_string(), "Cannot remove the circle owner");
}

#[tokio::test]
async fn rename_short_circuits_on_unchanged_name() {
    // Dead base URL proves the no-op never touches the network.
    let ops = CircleClient::new(api(&dead_base_url()));
    let circle = snapshot("Readers", &[(1, "alice", Role::Owner)]);
    let caps = Capabilities::for_role(Role::Owner);

    let outcome = ops.rename(&circle, &caps, "Readers").await.expect("no-op rename");
    assert_eq!(outcome, RenameOutcome::Unchanged);
}

#[tokio::test]
async fn rename_is_gated_on_settings_capability() {
    let ops = CircleClient::new(api(&dead_base_url()));
    let circle = snapshot("Readers", &[(1, "alice", Role::Owner), (2, "bob", Role::Member)]);

    let err = ops
        .rename(&circle, &Capabilities::for_role(Role::Member), "Book Club")
        .await
        .expect_err("members cannot rename");
    assert!(matches!(err, ClientError::Forbidden(_)));

    let err = ops
        .rename(&circle, &Capabilities::for_role(Role::Owner), "ab")
        .await
        .expect_err("length gate");
    assert!(matches!(err, ClientError::Invalid(_)));
}

#[tokio::test]
async fn rename_round_trips_through_the_server() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let ops = CircleClient::new(alice_api);
    let circle = ops.create("Readers", Some("books")).await.expect("create");

    let outcome = ops
        .rename(&circle, &Capabilities::for_role(Role::Owner), "Book Club")
        .await
        .expect("rename");
    match outcome {
        RenameOutcome::Renamed(updated) => {
            assert_eq!(updated.name, "Book Club");
            assert_eq!(updated.description.as_deref(), Some("books"));
        }
        other => panic!("expected Renamed, got {other:?}"),
    }
}

#[tokio::test]
async fn add_member_surfaces_duplicate_as_validation_error() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (_, _, bob) = signed_in_user(&server.base_url, "bob").await;

    let ops = CircleClient::new(alice_api);
    let circle = ops.create("Readers", None).await.expect("create");
    ops.add_member(circle.id, bob.id).await.expect("add bob");

    let err = ops.add_member(circle.id, bob.id).await.expect_err("duplicate");
    assert!(matches!(err, ClientError::Invalid(_)), "got {err:?}");
    assert_eq!(err.to_string(), "User is already a member of this circle");
}

#[tokio::test]
async fn circle_load_failures_are_typed_for_the_error_view() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (bob_api, _, _bob) = signed_in_user(&server.base_url, "bob").await;

    let owner_ops = CircleClient::new(alice_api);
    let circle = owner_ops.create("Readers", None).await.expect("create");

    let bob_ops = CircleClient::new(bob_api);
    let err = bob_ops.fetch(circle.id).await.expect_err("not a member");
    assert!(matches!(err, ClientError::Forbidden(_)));
    assert_eq!(err.to_string(), "You are not a member of this circle");

    let err = bob_ops.fetch(9999).await.expect_err("missing circle");
    assert!(matches!(err, ClientError::NotFound(_)));
    assert_eq!(err.to_string(), "Circle not found");
}

#[tokio::test]
async fn posts_flow_through_the_client() {
    let server = spawn_app().await;
    let (alice_api, _, _alice) = signed_in_user(&server.base_url, "alice").await;
    let (bob_api, _, _bob) = signed_in_user(&server.base_url, "bob").await;

    let ops = CircleClient::new(alice_api);
    let circle = ops.create("Readers", None).await.expect("create");
    let post = ops
        .create_post("Reading list", "Dune first.", Some(circle.id))
        .await
        .expect("post");
    assert_eq!(post.circle_id, Some(circle.id));

    let feed = ops.feed(20, 0).await.expect("feed");
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].title, "Reading list");

    // Bob is not a member: his feed never carries the post.
    let bob_ops = CircleClient::new(bob_api);
    let feed = bob_ops.feed(20, 0).await.expect("feed");
    assert!(feed.is_empty());

    // Local gate: empty titles never reach the server.
    let err = ops
        .create_post("", "body", None)
        .await
        .expect_err("empty title");
    assert!(matches!(err, ClientError::Invalid(_)));
}
