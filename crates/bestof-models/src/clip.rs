//! Clip models.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A platform clip with the popularity and timing data the pipeline needs.
///
/// Built once from upstream records and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Platform-unique clip id
    pub id: String,
    /// Public clip URL
    pub url: String,
    /// Clip title as set by the clipper
    pub title: String,
    /// Display name of the broadcaster the clip was taken from
    pub broadcaster_name: String,
    /// Thumbnail URL (empty when the platform did not provide one)
    #[serde(default)]
    pub thumbnail_url: String,
    /// Number of views
    #[serde(default)]
    pub view_count: u64,
    /// Creation time of the clip
    pub created_at: DateTime<Utc>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
}

impl Clip {
    /// Duration in seconds, clamped to zero for malformed upstream values.
    pub fn duration_secs(&self) -> f64 {
        if self.duration.is_finite() {
            self.duration.max(0.0)
        } else {
            0.0
        }
    }
}

/// A clip that has been resolved to a local media file for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedClip {
    /// Local media file
    pub path: PathBuf,
    /// Broadcaster shown in the on-screen caption
    pub broadcaster_name: String,
    /// Id of the originating clip
    pub clip_id: String,
}

impl DownloadedClip {
    pub fn new(path: impl Into<PathBuf>, clip: &Clip) -> Self {
        Self {
            path: path.into(),
            broadcaster_name: clip.broadcaster_name.clone(),
            clip_id: clip.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Clip {
        Clip {
            id: "AwkwardHelplessSalamander".to_string(),
            url: "https://clips.twitch.tv/AwkwardHelplessSalamander".to_string(),
            title: "gg".to_string(),
            broadcaster_name: "streamer".to_string(),
            thumbnail_url: String::new(),
            view_count: 42,
            created_at: Utc.with_ymd_and_hms(2025, 3, 2, 18, 30, 0).unwrap(),
            duration: 27.5,
        }
    }

    #[test]
    fn test_clip_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "abc",
            "url": "https://clips.twitch.tv/abc",
            "title": "t",
            "broadcaster_name": "b",
            "created_at": "2025-03-02T18:30:00Z"
        }"#;
        let clip: Clip = serde_json::from_str(json).unwrap();
        assert_eq!(clip.view_count, 0);
        assert_eq!(clip.duration, 0.0);
        assert!(clip.thumbnail_url.is_empty());
    }

    #[test]
    fn test_duration_secs_clamps_invalid_values() {
        let mut clip = sample();
        assert_eq!(clip.duration_secs(), 27.5);

        clip.duration = -3.0;
        assert_eq!(clip.duration_secs(), 0.0);

        clip.duration = f64::NAN;
        assert_eq!(clip.duration_secs(), 0.0);
    }

    #[test]
    fn test_downloaded_clip_keeps_attribution() {
        let clip = sample();
        let downloaded = DownloadedClip::new("/tmp/01_abc.mp4", &clip);
        assert_eq!(downloaded.broadcaster_name, "streamer");
        assert_eq!(downloaded.clip_id, clip.id);
    }
}
