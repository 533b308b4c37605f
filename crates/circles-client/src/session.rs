//! Session lifecycle: the single source of truth for "who is asking".
//!
//! State machine: `Unknown` (only during bootstrap) resolves to
//! `Authenticated` or `Anonymous`; login and logout move between the two
//! resolved states. An epoch counter serializes completions: a bootstrap
//! response that lands after an explicit login or logout is discarded, so
//! the later user action always wins.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use circles_types::api::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
};
use circles_types::models::UserProfile;
use circles_types::validate;

use crate::api::ApiClient;
use crate::error::ClientError;

/// Login input. Username is the identifier scheme used throughout.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Resolved view of the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthPhase {
    /// Bootstrap still in flight; render a neutral waiting state.
    Unknown,
    Anonymous,
    Authenticated(UserProfile),
}

struct SessionState {
    user: Option<UserProfile>,
    loading: bool,
    epoch: u64,
}

pub struct SessionManager {
    api: Arc<ApiClient>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: Mutex::new(SessionState {
                user: None,
                loading: true,
                epoch: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the lock leaves plain data; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current phase.
    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        let state = self.lock();
        if state.loading {
            AuthPhase::Unknown
        } else {
            match &state.user {
                Some(user) => AuthPhase::Authenticated(user.clone()),
                None => AuthPhase::Anonymous,
            }
        }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    /// Restores an existing session from the cookie store, once at
    /// startup. Never fails: 401 and transport errors alike resolve to
    /// Anonymous. A login or logout that completes while this request is
    /// in flight wins; the stale response is dropped.
    pub async fn bootstrap(&self) {
        let started_epoch = self.lock().epoch;

        let result = self
            .api
            .get_json::<UserProfile>("/auth/me", "Not authenticated")
            .await;

        let mut state = self.lock();
        if state.epoch == started_epoch {
            match result {
                Ok(user) => state.user = Some(user),
                Err(e) => debug!("no existing session: {}", e),
            }
        } else {
            debug!("discarding stale bootstrap result");
        }
        state.loading = false;
    }

    /// Authenticates and adopts the returned profile. Failures carry the
    /// server's `{detail}` message when present and leave the state
    /// untouched. A logout that completed while this request was in
    /// flight wins: the late profile is not adopted.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ClientError> {
        let started_epoch = self.lock().epoch;

        let body = LoginRequest {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        };
        let resp: LoginResponse = self.api.post_json("/auth/login", &body, "Login failed").await?;

        let mut state = self.lock();
        if state.epoch == started_epoch {
            state.epoch += 1;
            state.user = Some(resp.user.clone());
            state.loading = false;
        } else {
            debug!("discarding stale login result");
        }
        Ok(resp.user)
    }

    /// Creates an account. Validates locally before any network call and
    /// never establishes a session; callers log in afterwards.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ClientError> {
        validate::username(&registration.username).map_err(ClientError::Invalid)?;
        validate::password(&registration.password).map_err(ClientError::Invalid)?;
        if let Some(email) = &registration.email {
            validate::email(email).map_err(ClientError::Invalid)?;
        }
        if let Some(full_name) = &registration.full_name {
            validate::full_name(full_name).map_err(ClientError::Invalid)?;
        }

        let body = RegisterRequest {
            username: registration.username.clone(),
            password: registration.password.clone(),
            full_name: registration.full_name.clone(),
            email: registration.email.clone(),
        };
        let resp: RegisterResponse = self
            .api
            .post_json("/auth/register", &body, "Registration failed")
            .await?;
        Ok(resp.user)
    }

    /// Fail-open logout: local state becomes Anonymous immediately and
    /// unconditionally; the server invalidation is best-effort. Clearing
    /// state first also guarantees an in-flight bootstrap or login cannot
    /// resurrect the old identity.
    pub async fn logout(&self) {
        {
            let mut state = self.lock();
            state.epoch += 1;
            state.user = None;
            state.loading = false;
        }

        let result: Result<LogoutResponse, ClientError> = self
            .api
            .post_json("/auth/logout", &serde_json::json!({}), "Logout failed")
            .await;
        if let Err(e) = result {
            warn!("logout request failed, local session cleared anyway: {}", e);
        }
    }
}
