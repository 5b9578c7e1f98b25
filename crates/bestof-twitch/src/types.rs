//! Helix wire types.
//!
//! Every field the pipeline reads is optional on the wire; conversion into
//! [`Clip`] decides what is required.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use bestof_models::Clip;

use crate::error::{TwitchError, TwitchResult};

/// One page of a paginated Helix response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Cursor for the next page, if any.
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Decode page records one at a time. A record that does not match `T` is
/// logged and skipped instead of failing the whole page.
pub fn decode_records<T: DeserializeOwned>(records: Vec<serde_json::Value>, kind: &str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record
                .get("id")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("?")
                .to_string();
            match serde_json::from_value(record) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!("Skipping malformed {} record {}: {}", kind, id, e);
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelixClip {
    pub id: Option<String>,
    pub url: Option<String>,
    pub broadcaster_id: Option<String>,
    pub broadcaster_name: Option<String>,
    pub game_id: Option<String>,
    pub title: Option<String>,
    pub view_count: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<f64>,
}

impl HelixClip {
    pub fn has_broadcaster_name(&self) -> bool {
        self.broadcaster_name
            .as_deref()
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false)
    }

    /// Title check used by the optional term filter (case-insensitive).
    pub fn title_contains(&self, term_lower: &str) -> bool {
        self.title
            .as_deref()
            .map(|title| title.to_lowercase().contains(term_lower))
            .unwrap_or(false)
    }

    /// Convert into a [`Clip`]; `id`, `url` and `created_at` are required.
    pub fn into_clip(self) -> TwitchResult<Clip> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TwitchError::InvalidResponse("clip without id".to_string()))?;
        let url = self
            .url
            .ok_or_else(|| TwitchError::InvalidResponse(format!("clip {} has no url", id)))?;
        let created_at = self.created_at.ok_or_else(|| {
            TwitchError::InvalidResponse(format!("clip {} has no created_at", id))
        })?;

        Ok(Clip {
            id,
            url,
            title: self.title.unwrap_or_default(),
            broadcaster_name: self.broadcaster_name.unwrap_or_default(),
            thumbnail_url: self.thumbnail_url.unwrap_or_default(),
            view_count: self.view_count.unwrap_or(0),
            created_at,
            duration: self.duration.unwrap_or(0.0).max(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelixStream {
    pub user_id: Option<String>,
    pub user_login: Option<String>,
    pub user_name: Option<String>,
    pub game_id: Option<String>,
    pub title: Option<String>,
    pub viewer_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub display_name: String,
}

impl HelixUser {
    /// Display name, falling back to the login, then the id.
    pub fn best_name(&self) -> &str {
        [self.display_name.as_str(), self.login.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// App access token response from the OAuth endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_page_parses_with_missing_fields() {
        let json = r#"{
            "data": [{
                "id": "AwkwardHelplessSalamanderSwiftRage",
                "url": "https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage",
                "broadcaster_id": "67955580",
                "broadcaster_name": "",
                "game_id": "32982",
                "title": "[MindCity] Big chase",
                "view_count": 1863,
                "created_at": "2025-02-27T21:04:39Z",
                "duration": 28.4
            }],
            "pagination": {"cursor": "eyJiIjpudWxs"}
        }"#;
        let page: Page<HelixClip> = serde_json::from_str(json).unwrap();

        assert_eq!(page.next_cursor(), Some("eyJiIjpudWxs"));
        let raw = page.data.into_iter().next().unwrap();
        assert!(!raw.has_broadcaster_name());
        assert!(raw.title_contains("[mindcity]"));

        let clip = raw.into_clip().unwrap();
        assert_eq!(clip.view_count, 1863);
        assert_eq!(clip.thumbnail_url, "");
    }

    #[test]
    fn test_decode_records_skips_malformed_entries() {
        let records = vec![
            serde_json::json!({"id": "good", "created_at": "2025-02-27T21:04:39Z", "view_count": 3}),
            serde_json::json!({"id": "bad-date", "created_at": "yesterday"}),
            serde_json::json!({"id": "bad-views", "view_count": "many"}),
        ];
        let clips: Vec<HelixClip> = decode_records(records, "clip");

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].id.as_deref(), Some("good"));
    }

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let page: Page<HelixStream> =
            serde_json::from_str(r#"{"data": [], "pagination": {"cursor": ""}}"#).unwrap();
        assert!(page.next_cursor().is_none());

        let page: Page<HelixStream> = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.next_cursor().is_none());
    }

    #[test]
    fn test_clip_without_created_at_is_rejected() {
        let raw = HelixClip {
            id: Some("x".into()),
            url: Some("https://clips.twitch.tv/x".into()),
            ..Default::default()
        };
        assert!(matches!(raw.into_clip(), Err(TwitchError::InvalidResponse(_))));
    }

    #[test]
    fn test_user_best_name() {
        let user = HelixUser {
            id: "42".into(),
            login: "alice".into(),
            display_name: "".into(),
        };
        assert_eq!(user.best_name(), "alice");

        let anonymous = HelixUser {
            id: "42".into(),
            login: String::new(),
            display_name: String::new(),
        };
        assert_eq!(anonymous.best_name(), "42");
    }
}
