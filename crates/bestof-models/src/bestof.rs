//! Best-of metadata record.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clip::Clip;

/// One clip of a best-of, as listed in the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipEntry {
    pub id: String,
    pub title: String,
    pub broadcaster: String,
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub url: String,
    /// Start of the clip in the assembled video (`mm:ss`)
    pub timecode: String,
}

impl ClipEntry {
    pub fn from_clip(clip: &Clip, timecode: impl Into<String>) -> Self {
        Self {
            id: clip.id.clone(),
            title: clip.title.clone(),
            broadcaster: clip.broadcaster_name.clone(),
            views: clip.view_count,
            created_at: clip.created_at,
            url: clip.url.clone(),
            timecode: timecode.into(),
        }
    }
}

/// The durable output of a generation run.
///
/// Field names match the JSON document consumed by the publishing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BestOfRecord {
    /// Generation date (`YYYY-MM-DD`)
    pub date: NaiveDate,
    pub youtube_title: String,
    pub youtube_description: String,
    /// Path of the assembled video
    pub file_path: String,
    pub clips_count: usize,
    pub total_views: u64,
    /// Clips in the order they appear in the video
    pub clips: Vec<ClipEntry>,
}
