//! Session lifecycle tests against a real server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::{get, post}};
use serde_json::json;

use circles_client::{AuthPhase, ClientError, RouteDecision, SessionManager};
use common::*;

#[tokio::test]
async fn bootstrap_without_session_resolves_anonymous() {
    let server = spawn_app().await;
    let manager = SessionManager::new(api(&server.base_url));

    assert_eq!(manager.phase(), AuthPhase::Unknown);
    assert_eq!(manager.route_gate(), RouteDecision::Wait);

    // The server answers 401; bootstrap must complete without error.
    manager.bootstrap().await;

    assert_eq!(manager.phase(), AuthPhase::Anonymous);
    assert_eq!(manager.route_gate(), RouteDecision::RedirectToLogin);
    assert!(manager.current_user().is_none());
}

#[tokio::test]
async fn bootstrap_transport_failure_degrades_to_anonymous() {
    let manager = SessionManager::new(api(&dead_base_url()));
    manager.bootstrap().await;
    assert_eq!(manager.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn login_adopts_profile_and_opens_the_gate() {
    let server = spawn_app().await;
    let (_, manager, user) = signed_in_user(&server.base_url, "alice").await;

    assert_eq!(user.username, "alice");
    match manager.phase() {
        AuthPhase::Authenticated(profile) => assert_eq!(profile.username, "alice"),
        other => panic!("expected Authenticated, got {other:?}"),
    }
    assert_eq!(manager.route_gate(), RouteDecision::Render);
}

#[tokio::test]
async fn register_does_not_establish_a_session() {
    let server = spawn_app().await;
    let api = api(&server.base_url);
    let manager = SessionManager::new(api.clone());

    let user = manager.register(&registration("alice")).await.expect("register");
    assert_eq!(user.username, "alice");

    manager.bootstrap().await;
    assert_eq!(manager.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn session_is_restored_from_the_cookie_store() {
    let server = spawn_app().await;
    let (api, _, _) = signed_in_user(&server.base_url, "alice").await;

    // A fresh manager over the same cookie jar plays the reloaded app.
    let restored = SessionManager::new(api);
    restored.bootstrap().await;
    match restored.phase() {
        AuthPhase::Authenticated(profile) => assert_eq!(profile.username, "alice"),
        other => panic!("expected restored session, got {other:?}"),
    }
}

#[tokio::test]
async fn login_failure_surfaces_the_server_detail_verbatim() {
    let server = spawn_app().await;
    let api = api(&server.base_url);
    let manager = SessionManager::new(api);
    manager.register(&registration("bob")).await.expect("register");
    manager.bootstrap().await;

    let mut bad = credentials("bob");
    bad.password = "wrong".to_string();
    let err = manager.login(&bad).await.expect_err("login must fail");

    assert!(matches!(err, ClientError::Unauthorized(_)), "got {err:?}");
    assert_eq!(err.to_string(), "Invalid credentials");
    // Failed login leaves the session state untouched.
    assert_eq!(manager.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn register_validates_locally_before_any_network_call() {
    // Nothing listens here: reaching the network would fail loudly with
    // a transport error, so a validation error proves the gate ran first.
    let manager = SessionManager::new(api(&dead_base_url()));

    let err = manager
        .register(&registration("ab"))
        .await
        .expect_err("short username must be rejected");
    assert!(matches!(err, ClientError::Invalid(_)), "got {err:?}");
    assert!(err.to_string().contains('3'), "message names the bound: {err}");

    let mut weak = registration("charlie");
    weak.password = "x".to_string();
    let err = manager.register(&weak).await.expect_err("weak password");
    assert!(matches!(err, ClientError::Invalid(_)));

    let mut bad_mail = registration("charlie");
    bad_mail.email = Some("not-an-email".to_string());
    let err = manager.register(&bad_mail).await.expect_err("bad email");
    assert!(matches!(err, ClientError::Invalid(_)));
}

#[tokio::test]
async fn logout_is_fail_open_on_transport_failure() {
    let server = spawn_app().await;
    let (_, manager, _) = signed_in_user(&server.base_url, "alice").await;

    server.shut_down();
    // Give the listener a moment to actually close.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The request fails, but no error escapes and local state clears.
    manager.logout().await;
    assert_eq!(manager.phase(), AuthPhase::Anonymous);
    assert_eq!(manager.route_gate(), RouteDecision::RedirectToLogin);
}

#[tokio::test]
async fn logout_invalidates_the_session_server_side() {
    let server = spawn_app().await;
    let (api, manager, _) = signed_in_user(&server.base_url, "alice").await;

    manager.logout().await;
    assert_eq!(manager.phase(), AuthPhase::Anonymous);

    // The old cookie is gone (and the session row with it): a restore
    // attempt stays anonymous.
    let restored = SessionManager::new(api);
    restored.bootstrap().await;
    assert_eq!(restored.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn expired_sessions_do_not_restore() {
    let server = spawn_app_with_ttl(-5).await;
    let (api, _, _) = signed_in_user(&server.base_url, "alice").await;

    let restored = SessionManager::new(api);
    restored.bootstrap().await;
    assert_eq!(restored.phase(), AuthPhase::Anonymous);
}

#[tokio::test]
async fn stale_bootstrap_never_overwrites_a_logout() {
    // A server whose who-am-I answer arrives late, after the user has
    // already logged out.
    let app = Router::new()
        .route(
            "/api/v1/auth/me",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({
                    "id": 1,
                    "username": "alice",
                    "email": null,
                    "full_name": null,
                    "created_at": "2026-01-01T00:00:00Z"
                }))
            }),
        )
        .route(
            "/api/v1/auth/logout",
            post(|| async { Json(json!({"success": true, "message": "Logged out successfully"})) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let manager = Arc::new(SessionManager::new(api(&format!("http://{}/api/v1", addr))));

    let bootstrapping = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    manager.logout().await;
    bootstrapping.await.unwrap();

    // The delayed profile must have been discarded: logout wins.
    assert_eq!(manager.phase(), AuthPhase::Anonymous);
}
