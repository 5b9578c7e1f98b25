//! Helix HTTP client.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use bestof_models::Clip;

use crate::config::TwitchConfig;
use crate::error::{TwitchError, TwitchResult};
use crate::source::{
    sanitize_broadcaster_name, ClipQuery, ClipScope, ClipSource, LiveStream, StreamQuery,
};
use crate::types::{decode_records, HelixClip, HelixStream, HelixUser, Page, TokenResponse};

/// Spaces out page requests.
type PageLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Renew tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Client for the Helix API using an app access token.
pub struct HelixClient {
    http: Client,
    config: TwitchConfig,
    token: Mutex<Option<AccessToken>>,
    pacer: Option<PageLimiter>,
}

impl HelixClient {
    /// Create a new Helix client.
    pub fn new(config: TwitchConfig) -> TwitchResult<Self> {
        if config.client_id.is_empty() {
            return Err(TwitchError::MissingCredentials("TWITCH_CLIENT_ID"));
        }
        if config.client_secret.is_empty() {
            return Err(TwitchError::MissingCredentials("TWITCH_CLIENT_SECRET"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TwitchError::Network)?;

        let pacer = Quota::with_period(config.page_delay).map(RateLimiter::direct);

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
            pacer,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        Self::new(TwitchConfig::from_env()?)
    }

    async fn pace(&self) {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }
    }

    async fn access_token(&self) -> TwitchResult<String> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/oauth2/token", self.config.auth_url);
        debug!("Requesting app access token from {}", url);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TwitchError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// GET a Helix endpoint with retries.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> TwitchResult<T> {
        let url = format!("{}/{}", self.config.api_url, endpoint);
        self.with_retry(|| self.get_once(&url, endpoint, params))
            .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> TwitchResult<T> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .query(params)
            .header("Client-Id", self.config.client_id.as_str())
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.invalidate_token().await;
                Err(TwitchError::Auth(format!(
                    "{} rejected the access token",
                    endpoint
                )))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(TwitchError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(TwitchError::RequestFailed(format!(
                    "{} returned {}: {}",
                    endpoint, status, body
                )))
            }
            _ => {
                let bytes = response.bytes().await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> TwitchResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = TwitchResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Helix request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| TwitchError::RequestFailed("Unknown error".to_string())))
    }

    async fn fetch_users(&self, key: &str, value: &str) -> TwitchResult<Option<HelixUser>> {
        let page: Page<HelixUser> = self.get_json("users", &[(key, value.to_string())]).await?;
        Ok(page.data.into_iter().next())
    }

    /// Name for a broadcaster id: display name, else login, else the id.
    async fn broadcaster_name_for(&self, broadcaster_id: &str) -> String {
        match self.fetch_users("id", broadcaster_id).await {
            Ok(Some(user)) => user.best_name().to_string(),
            Ok(None) => broadcaster_id.to_string(),
            Err(e) => {
                warn!(
                    broadcaster_id = %broadcaster_id,
                    "Could not look up broadcaster name: {}",
                    e
                );
                broadcaster_id.to_string()
            }
        }
    }

    async fn collect_raw_clips(&self, query: &ClipQuery) -> TwitchResult<Vec<HelixClip>> {
        let mut base = vec![
            ("started_at", query.window.started_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ("ended_at", query.window.ended_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            ("first", query.page_size.to_string()),
        ];
        let game_filter = match &query.scope {
            ClipScope::Game(id) => {
                base.push(("game_id", id.clone()));
                Some(id.as_str())
            }
            ClipScope::Broadcaster(id) => {
                base.push(("broadcaster_id", id.clone()));
                None
            }
        };

        if query.max_clips == 0 {
            return Ok(Vec::new());
        }

        let mut names: HashMap<String, String> = HashMap::new();
        let mut collected = Vec::new();
        let mut cursor: Option<String> = None;

        'pages: loop {
            self.pace().await;

            let mut params = base.clone();
            if let Some(after) = &cursor {
                params.push(("after", after.clone()));
            }
            let page: Page<serde_json::Value> = self.get_json("clips", &params).await?;
            let next = page.next_cursor().map(str::to_string);
            let page_len = page.data.len();

            for mut raw in decode_records::<HelixClip>(page.data, "clip") {
                if let Some(game_id) = game_filter {
                    if raw.game_id.as_deref() != Some(game_id) {
                        continue;
                    }
                }

                if !raw.has_broadcaster_name() {
                    if let Some(id) = raw.broadcaster_id.clone() {
                        let name = match names.get(&id) {
                            Some(name) => name.clone(),
                            None => {
                                let name = self.broadcaster_name_for(&id).await;
                                names.insert(id, name.clone());
                                name
                            }
                        };
                        raw.broadcaster_name = Some(name);
                    }
                }

                collected.push(raw);
                if collected.len() >= query.max_clips {
                    info!("Reached the limit of {} clips", query.max_clips);
                    break 'pages;
                }
            }

            debug!("Fetched {} clips so far", collected.len());

            match next {
                Some(after) if page_len > 0 => cursor = Some(after),
                _ => break,
            }
        }

        Ok(collected)
    }
}

#[async_trait]
impl ClipSource for HelixClient {
    async fn fetch_clips(&self, query: &ClipQuery) -> TwitchResult<Vec<Clip>> {
        let raw = self.collect_raw_clips(query).await?;
        let fetched = raw.len();

        let filtered: Vec<HelixClip> = match &query.term {
            Some(term) => {
                let term_lower = term.to_lowercase();
                let kept: Vec<_> = raw
                    .into_iter()
                    .filter(|clip| clip.title_contains(&term_lower))
                    .collect();
                info!("{} of {} clips mention {:?}", kept.len(), fetched, term);
                kept
            }
            None => raw,
        };

        let clips = filtered
            .into_iter()
            .filter_map(|raw| match raw.into_clip() {
                Ok(clip) => Some(clip),
                Err(e) => {
                    warn!("Dropping clip record: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("Converted {} clips", clips.len());
        Ok(clips)
    }

    async fn fetch_live_streams(&self, query: &StreamQuery) -> TwitchResult<Vec<LiveStream>> {
        let base = vec![
            ("game_id", query.game_id.clone()),
            ("first", query.page_size.to_string()),
        ];

        let mut matches = Vec::new();
        let mut scanned = 0usize;
        let mut cursor: Option<String> = None;

        'pages: loop {
            self.pace().await;

            let mut params = base.clone();
            if let Some(after) = &cursor {
                params.push(("after", after.clone()));
            }
            let page: Page<serde_json::Value> = self.get_json("streams", &params).await?;
            let next = page.next_cursor().map(str::to_string);
            let page_len = page.data.len();

            for stream in decode_records::<HelixStream>(page.data, "stream") {
                scanned += 1;
                let (Some(user_name), Some(title)) = (stream.user_name, stream.title) else {
                    continue;
                };
                if !query.accepts(&user_name, &title) {
                    continue;
                }

                let matched_terms = query.matched_terms(&title);
                info!(
                    streamer = %user_name,
                    terms = ?matched_terms,
                    "Matched live stream: {}",
                    title
                );
                matches.push(LiveStream {
                    user_login: stream.user_login.unwrap_or_else(|| user_name.to_lowercase()),
                    user_name,
                    title,
                    matched_terms,
                });

                if matches.len() >= query.max_matches {
                    break 'pages;
                }
            }

            match next {
                Some(after) if page_len > 0 => cursor = Some(after),
                _ => break,
            }
        }

        info!(
            "Scanned {} live streams for game {}, {} matched",
            scanned,
            query.game_id,
            matches.len()
        );
        Ok(matches)
    }

    async fn resolve_broadcaster_id(&self, name: &str) -> TwitchResult<String> {
        let login = sanitize_broadcaster_name(name);
        if login.is_empty() {
            return Err(TwitchError::InvalidName(name.to_string()));
        }
        if login != name {
            warn!("Broadcaster name {:?} looked up as {:?}", name, login);
        }

        match self.fetch_users("login", &login).await? {
            Some(user) => Ok(user.id),
            None => Err(TwitchError::NotFound(format!("broadcaster {}", login))),
        }
    }

    async fn reconnect(&self) {
        info!("Dropping cached Helix credentials");
        self.invalidate_token().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            HelixClient::new(TwitchConfig::default()),
            Err(TwitchError::MissingCredentials("TWITCH_CLIENT_ID"))
        ));
        assert!(matches!(
            HelixClient::new(TwitchConfig::default().with_credentials("id", "")),
            Err(TwitchError::MissingCredentials("TWITCH_CLIENT_SECRET"))
        ));
    }

    #[test]
    fn test_zero_page_delay_disables_pacing() {
        let client = HelixClient::new(
            TwitchConfig::default()
                .with_credentials("id", "secret")
                .with_page_delay(Duration::ZERO),
        )
        .unwrap();
        assert!(client.pacer.is_none());
    }
}
