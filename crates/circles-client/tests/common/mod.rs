//! Shared test fixtures: a real server on an ephemeral port backed by
//! in-memory storage, and clients wired to it.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use tokio::task::JoinHandle;

use circles_api::auth::{AppState, AppStateInner};
use circles_client::{ApiClient, Credentials, Registration, SessionManager};
use circles_types::models::UserProfile;

pub struct TestServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Kills the server so subsequent requests fail at the transport level.
    pub fn shut_down(&self) {
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_app() -> TestServer {
    spawn_app_with_ttl(60).await
}

pub async fn spawn_app_with_ttl(ttl_minutes: i64) -> TestServer {
    let db = circles_db::Database::open_in_memory().expect("in-memory db");
    let state: AppState = Arc::new(AppStateInner {
        db,
        session_ttl: chrono::Duration::minutes(ttl_minutes),
    });
    let app = Router::new().nest("/api/v1", circles_api::router(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        base_url: format!("http://{}/api/v1", addr),
        handle,
    }
}

/// A base URL nothing listens on; requests fail with connection errors.
pub fn dead_base_url() -> String {
    "http://127.0.0.1:9/api/v1".to_string()
}

pub fn api(base_url: &str) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(base_url).expect("client"))
}

pub fn registration(username: &str) -> Registration {
    Registration {
        username: username.to_string(),
        password: "secret1".to_string(),
        email: None,
        full_name: None,
    }
}

pub fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: "secret1".to_string(),
    }
}

/// Registers and logs in a user on a fresh cookie jar; returns the
/// session manager (Authenticated) and the profile.
pub async fn signed_in_user(base_url: &str, username: &str) -> (Arc<ApiClient>, SessionManager, UserProfile) {
    let api = api(base_url);
    let manager = SessionManager::new(api.clone());
    manager
        .register(&registration(username))
        .await
        .expect("register");
    let user = manager.login(&credentials(username)).await.expect("login");
    (api, manager, user)
}
