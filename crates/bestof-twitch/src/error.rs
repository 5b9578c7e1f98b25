//! Twitch client error types.

use thiserror::Error;

pub type TwitchResult<T> = Result<T, TwitchError>;

#[derive(Debug, Error)]
pub enum TwitchError {
    #[error("Twitch credentials missing: set {0}")]
    MissingCredentials(&'static str),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid broadcaster name: {0:?}")]
    InvalidName(String),

    #[error("Rate limited by Helix")]
    RateLimited,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TwitchError {
    /// Transient failures worth another attempt.
    ///
    /// `Auth` is included because a rejected token is dropped before the
    /// error is returned, so the next attempt authenticates again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TwitchError::Auth(_) | TwitchError::RateLimited | TwitchError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(TwitchError::RateLimited.is_retryable());
        assert!(TwitchError::Auth("expired".into()).is_retryable());
        assert!(!TwitchError::NotFound("alice".into()).is_retryable());
        assert!(!TwitchError::MissingCredentials("TWITCH_CLIENT_ID").is_retryable());
    }
}
