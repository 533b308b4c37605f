use thiserror::Error;

/// Typed client-side failure. The display string is always the message a
/// UI can show directly; server `{detail}` text passes through verbatim.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials rejected or session expired (401).
    #[error("{0}")]
    Unauthorized(String),
    /// The server refused the action (403). Authoritative: the action did
    /// not happen, whatever the local capability computation said.
    #[error("{0}")]
    Forbidden(String),
    /// Input failed validation, locally or at the server (400/422).
    #[error("{0}")]
    Invalid(String),
    /// Target missing or inaccessible (404).
    #[error("{0}")]
    NotFound(String),
    /// The server answered but outside the expected contract (5xx).
    #[error("{0}")]
    Server(String),
    /// Response body did not match the expected schema.
    #[error("{0}")]
    Payload(String),
    /// The request never completed (connection refused, timeout, DNS).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Whether this is worth retrying as-is (transient, not a rule).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server(_))
    }
}
