//! Clip selection: popularity first, chronology second.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tracing::info;

use bestof_models::Clip;

/// How clips returned by several source queries are de-duplicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Rank every record as fetched, duplicates included.
    #[default]
    Keep,
    /// Keep only the first record seen for each clip id.
    DropById,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "keep" => Ok(Self::Keep),
            "drop-by-id" | "dedupe" => Ok(Self::DropById),
            other => Err(format!("unknown duplicate policy: {}", other)),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::DropById => f.write_str("drop-by-id"),
        }
    }
}

/// Pick the `total` most viewed clips, then order them by creation time.
///
/// Both sorts are stable: equal view counts keep fetch order, equal
/// timestamps keep popularity order.
pub fn select_clips(clips: Vec<Clip>, total: usize, policy: DuplicatePolicy) -> Vec<Clip> {
    let mut candidates = match policy {
        DuplicatePolicy::Keep => clips,
        DuplicatePolicy::DropById => {
            let mut seen = HashSet::new();
            clips
                .into_iter()
                .filter(|clip| seen.insert(clip.id.clone()))
                .collect()
        }
    };

    candidates.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    candidates.truncate(total);
    candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    candidates
}

/// Log the first five entries of `clips` under `heading`.
pub fn log_selection(heading: &str, clips: &[Clip]) {
    info!("{}", heading);
    for (i, clip) in clips.iter().take(5).enumerate() {
        info!(
            "  {}. {} - {} views - {} ({})",
            i + 1,
            clip.title,
            clip.view_count,
            clip.created_at.format("%Y-%m-%d %H:%M"),
            clip.broadcaster_name
        );
    }
    if clips.len() > 5 {
        info!("  ... and {} more", clips.len() - 5);
    }
}

/// Popularity order of `clips` without changing the input, for reporting.
pub fn by_popularity(clips: &[Clip]) -> Vec<Clip> {
    let mut ranked = clips.to_vec();
    ranked.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    ranked
}
