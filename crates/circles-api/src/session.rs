//! Opaque session tokens and their cookie.
//!
//! Tokens are 32 random bytes, URL-safe base64. The value is meaningless
//! to the client; the server-side sessions table is the source of truth.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

pub const SESSION_COOKIE: &str = "session_token";

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// HTTP-only, SameSite=Lax: the browser sends it, scripts never read it.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .build()
}

/// (created_at, expires_at) as RFC 3339 strings for the sessions table.
pub fn session_window(ttl: Duration) -> (String, String) {
    let now = Utc::now();
    (now.to_rfc3339(), (now + ttl).to_rfc3339())
}

/// Unparseable expiry counts as expired.
pub fn is_expired(expires_at: &str) -> bool {
    match expires_at.parse::<DateTime<Utc>>() {
        Ok(when) => when <= Utc::now(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_opaque() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.len() >= 40);
        assert!(!a.contains('='));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn expiry_check() {
        let (_, future) = session_window(Duration::minutes(5));
        assert!(!is_expired(&future));
        let past = (Utc::now() - Duration::minutes(1)).to_rfc3339();
        assert!(is_expired(&past));
        assert!(is_expired("not-a-timestamp"));
    }
}
