//! Protected-view gating derived from session state.

use crate::session::{AuthPhase, SessionManager};

/// What a protected view should do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session still resolving: show a neutral indicator, never the
    /// protected content and never a redirect.
    Wait,
    /// Resolved anonymous: send the user to the login entry point.
    RedirectToLogin,
    /// Authenticated: render the requested content unchanged.
    Render,
}

/// Pure decision; re-evaluate whenever the phase changes.
#[must_use]
pub fn route_decision(phase: &AuthPhase) -> RouteDecision {
    match phase {
        AuthPhase::Unknown => RouteDecision::Wait,
        AuthPhase::Anonymous => RouteDecision::RedirectToLogin,
        AuthPhase::Authenticated(_) => RouteDecision::Render,
    }
}

impl SessionManager {
    #[must_use]
    pub fn route_gate(&self) -> RouteDecision {
        route_decision(&self.phase())
    }
}
