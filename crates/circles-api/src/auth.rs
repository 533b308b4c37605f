use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;

use circles_db::Database;
use circles_types::api::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
};
use circles_types::models::UserProfile;
use circles_types::validate;

use crate::convert;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;
use crate::session::{self, SESSION_COOKIE};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_ttl: Duration,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    validate::username(&req.username).map_err(ApiError::BadRequest)?;
    validate::password(&req.password).map_err(ApiError::BadRequest)?;
    if let Some(email) = &req.email {
        validate::email(email).map_err(ApiError::BadRequest)?;
    }
    if let Some(full_name) = &req.full_name {
        validate::full_name(full_name).map_err(ApiError::BadRequest)?;
    }

    let db = state.clone();
    let user = run_blocking(move || {
        if db.db.get_user_by_username(&req.username)?.is_some() {
            return Err(ApiError::BadRequest("Username already taken".into()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user_id = db.db.create_user(
            &req.username,
            req.email.as_deref(),
            req.full_name.as_deref(),
            &password_hash,
        )?;

        db.db
            .get_user_by_id(user_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("created user {} not found", user_id)))
    })
    .await?;

    // Registration does not establish a session; the client logs in next.
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user: convert::user_profile(user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ttl = state.session_ttl;
    let db = state.clone();
    let (user, token) = run_blocking(move || {
        let user = db
            .db
            .get_user_by_username(&req.username)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized("Invalid credentials".into()))?;

        let token = session::generate_token();
        let (created_at, expires_at) = session::session_window(ttl);
        db.db.create_session(&token, user.id, &created_at, &expires_at)?;

        Ok((user, token))
    })
    .await?;

    let jar = jar.add(session::session_cookie(token));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: convert::user_profile(user),
        }),
    ))
}

/// Session invalidation is best-effort: the response is a success and the
/// cookie is cleared whether or not a live session row existed.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        let db = state.clone();
        run_blocking(move || {
            db.db.delete_session(&token)?;
            Ok(())
        })
        .await?;
    }

    let jar = jar.remove(session::removal_cookie());
    Ok((
        jar,
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully".into(),
        }),
    ))
}

/// Who-am-I: the session bootstrap query.
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserProfile>, ApiError> {
    let db = state.clone();
    let user = run_blocking(move || {
        db.db
            .get_user_by_id(current.id)?
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))
    })
    .await?;
    Ok(Json(convert::user_profile(user)))
}
