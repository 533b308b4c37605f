use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;
use crate::session::{self, SESSION_COOKIE};

/// The authenticated identity, resolved from the session cookie and
/// attached to the request for downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Resolve the session cookie to a live user, or answer 401.
///
/// Expired sessions are purged on sight.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

    let db = state.clone();
    let user = run_blocking(move || {
        let Some(record) = db.db.get_session(&token)? else {
            return Err(ApiError::Unauthorized("Not authenticated".into()));
        };
        if session::is_expired(&record.expires_at) {
            db.db.delete_session(&token)?;
            return Err(ApiError::Unauthorized("Session expired".into()));
        }
        db.db
            .get_user_by_id(record.user_id)?
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))
    })
    .await?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}
