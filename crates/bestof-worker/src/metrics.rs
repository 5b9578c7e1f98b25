//! Pipeline counters.
//!
//! Recorded through the `metrics` facade; they are no-ops unless the host
//! installs a recorder.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CLIPS_FETCHED_TOTAL: &str = "bestof_clips_fetched_total";
    pub const CLIP_DOWNLOADS_TOTAL: &str = "bestof_clip_downloads_total";
    pub const STREAMERS_TRACKED_TOTAL: &str = "bestof_streamers_tracked_total";
    pub const RUNS_TOTAL: &str = "bestof_runs_total";
}

/// Record clips returned by the source for one streamer.
pub fn record_clips_fetched(count: usize) {
    counter!(names::CLIPS_FETCHED_TOTAL).increment(count as u64);
}

/// Record one download attempt (`downloaded`, `cached` or `failed`).
pub fn record_clip_download(outcome: &'static str) {
    counter!(names::CLIP_DOWNLOADS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record streamers newly added to the tracker.
pub fn record_streamers_tracked(count: usize) {
    counter!(names::STREAMERS_TRACKED_TOTAL).increment(count as u64);
}

/// Record the end of a generation run.
pub fn record_run(outcome: &'static str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
}
