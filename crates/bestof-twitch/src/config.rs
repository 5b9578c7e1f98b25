//! Helix client configuration.

use std::time::Duration;

use crate::error::{TwitchError, TwitchResult};

pub const DEFAULT_API_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv";

/// Configuration for [`HelixClient`](crate::HelixClient).
#[derive(Debug, Clone)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Helix base URL (no trailing slash)
    pub api_url: String,
    /// OAuth base URL (no trailing slash)
    pub auth_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Minimum spacing between paginated requests
    pub page_delay: Duration,
    /// Max retries for transient failures
    pub max_retries: u32,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout: Duration::from_secs(30),
            page_delay: Duration::from_millis(4000),
            max_retries: 2,
        }
    }
}

impl TwitchConfig {
    /// Create config from environment variables.
    ///
    /// `TWITCH_CLIENT_ID` and `TWITCH_CLIENT_SECRET` are required.
    pub fn from_env() -> TwitchResult<Self> {
        let defaults = Self::default();

        let client_id = required("TWITCH_CLIENT_ID")?;
        let client_secret = required("TWITCH_CLIENT_SECRET")?;

        Ok(Self {
            client_id,
            client_secret,
            api_url: std::env::var("TWITCH_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            auth_url: std::env::var("TWITCH_AUTH_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.auth_url),
            timeout: std::env::var("TWITCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            page_delay: std::env::var("TWITCH_PAGE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.page_delay),
            max_retries: std::env::var("TWITCH_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
        })
    }

    /// Config pointing both endpoints at `base_url`, for tests and proxies.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        self.api_url = base.clone();
        self.auth_url = base;
        self
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

fn required(name: &'static str) -> TwitchResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(TwitchError::MissingCredentials(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TwitchConfig::default();
        assert_eq!(config.api_url, "https://api.twitch.tv/helix");
        assert_eq!(config.page_delay, Duration::from_secs(4));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let config = TwitchConfig::default().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.auth_url, "http://127.0.0.1:9000");
    }
}
