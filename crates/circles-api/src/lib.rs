pub mod auth;
pub mod circles;
mod convert;
pub mod error;
pub mod members;
pub mod middleware;
pub mod posts;
pub mod session;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Runs blocking rusqlite work off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("background task failed"))
    })?
}

/// Builds the full API router. The server binary mounts this under the
/// versioned root; tests drive it directly.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/circles", post(circles::create_circle))
        .route("/circles/my", get(circles::my_circles))
        .route("/circles/{circle_id}", get(circles::get_circle))
        .route("/circles/{circle_id}", put(circles::update_circle))
        .route("/circles/{circle_id}", delete(circles::delete_circle))
        .route("/circles/{circle_id}/name", put(circles::rename_circle))
        .route("/circles/{circle_id}/members", post(members::add_member))
        .route(
            "/circles/{circle_id}/members/{user_id}",
            delete(members::remove_member),
        )
        .route(
            "/circles/{circle_id}/members/{user_id}/role",
            put(members::update_member_role),
        )
        .route("/users/search", get(users::search_users))
        .route("/posts", post(posts::create_post))
        .route("/posts/feed", get(posts::get_feed))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}", delete(posts::delete_post))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
