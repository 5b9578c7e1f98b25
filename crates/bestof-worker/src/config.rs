//! Worker configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use bestof_media::{CaptionConfig, TimelineAssembler, TimelineAssets};
use bestof_models::{EncodingConfig, OutputProfile};

use crate::scheduler::WeeklySchedule;
use crate::selector::DuplicatePolicy;

/// GTA V on Twitch.
pub const DEFAULT_GAME_ID: &str = "32982";

pub const DEFAULT_SEARCH_TERMS: &[&str] =
    &["[MindCityRP]", "[MindCity]", "[MindCity RP]", "[MindCity-RP]"];

const TRACKER_FILE: &str = "tracked_streamers.json";

/// Best-of pipeline configuration.
#[derive(Debug, Clone)]
pub struct BestOfConfig {
    /// Game whose live streams are monitored
    pub game_id: String,
    /// Stream title terms that mark a streamer for tracking
    pub search_terms: Vec<String>,
    /// Clips fetched per tracked streamer
    pub max_clips_per_streamer: usize,
    /// Clips in the final best-of
    pub total_bestof_clips: usize,
    /// Interval between live-stream checks
    pub poll_interval: Duration,
    /// Matching streams recorded per check
    pub max_streamers_per_check: usize,
    /// Page size for live-stream requests
    pub stream_page_size: u32,
    /// How far back clips are fetched
    pub clip_window_days: u32,
    /// Directory holding the tracker file
    pub data_dir: PathBuf,
    /// Directory receiving videos, metadata and the staging directory
    pub output_dir: PathBuf,
    /// Pause between streamers while gathering clips
    pub streamer_delay: Duration,
    /// Pause between clip downloads
    pub download_delay: Duration,
    pub duplicate_policy: DuplicatePolicy,
    /// When the weekly generation runs (local time)
    pub schedule: WeeklySchedule,
    pub timeline: TimelineConfig,
}

impl Default for BestOfConfig {
    fn default() -> Self {
        Self {
            game_id: DEFAULT_GAME_ID.to_string(),
            search_terms: DEFAULT_SEARCH_TERMS.iter().map(|s| s.to_string()).collect(),
            max_clips_per_streamer: 30,
            total_bestof_clips: 20,
            poll_interval: Duration::from_secs(15 * 60),
            max_streamers_per_check: 10,
            stream_page_size: 100,
            clip_window_days: 7,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("bestof"),
            streamer_delay: Duration::from_secs(2),
            download_delay: Duration::from_secs(1),
            duplicate_policy: DuplicatePolicy::Keep,
            schedule: WeeklySchedule::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl BestOfConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let schedule = WeeklySchedule::parse(
            &std::env::var("BESTOF_SCHEDULE_DAY").unwrap_or_else(|_| "sunday".to_string()),
            &std::env::var("BESTOF_SCHEDULE_TIME").unwrap_or_else(|_| "00:00".to_string()),
        )
        .unwrap_or_else(|e| {
            warn!("Ignoring schedule override: {}", e);
            defaults.schedule
        });

        Self {
            game_id: std::env::var("BESTOF_GAME_ID").unwrap_or(defaults.game_id),
            search_terms: std::env::var("BESTOF_SEARCH_TERMS")
                .map(|s| parse_terms(&s))
                .ok()
                .filter(|terms| !terms.is_empty())
                .unwrap_or(defaults.search_terms),
            max_clips_per_streamer: env_parse(
                "BESTOF_MAX_CLIPS_PER_STREAMER",
                defaults.max_clips_per_streamer,
            ),
            total_bestof_clips: env_parse("BESTOF_TOTAL_CLIPS", defaults.total_bestof_clips),
            poll_interval: Duration::from_secs(
                env_parse::<u64>("BESTOF_POLL_INTERVAL_MINUTES", 15).max(1) * 60,
            ),
            max_streamers_per_check: env_parse(
                "BESTOF_MAX_STREAMERS_PER_CHECK",
                defaults.max_streamers_per_check,
            ),
            stream_page_size: env_parse("BESTOF_STREAM_PAGE_SIZE", defaults.stream_page_size),
            clip_window_days: env_parse("BESTOF_CLIP_WINDOW_DAYS", defaults.clip_window_days),
            data_dir: std::env::var("BESTOF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            output_dir: std::env::var("BESTOF_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            streamer_delay: Duration::from_secs(env_parse("BESTOF_STREAMER_DELAY_SECS", 2)),
            download_delay: Duration::from_secs(env_parse("BESTOF_DOWNLOAD_DELAY_SECS", 1)),
            duplicate_policy: env_parse("BESTOF_DUPLICATE_POLICY", defaults.duplicate_policy),
            schedule,
            timeline: TimelineConfig::from_env(),
        }
    }

    /// Location of the tracked streamer list.
    pub fn tracker_path(&self) -> PathBuf {
        self.data_dir.join(TRACKER_FILE)
    }
}

/// Assembly assets and output format.
#[derive(Debug, Clone)]
pub struct TimelineConfig {
    pub intro_path: PathBuf,
    pub outro_path: PathBuf,
    pub transition_path: PathBuf,
    pub font_path: String,
    pub profile: OutputProfile,
    pub encoding: EncodingConfig,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            intro_path: PathBuf::from("assets/videos/INTRO.mp4"),
            outro_path: PathBuf::from("assets/videos/OUTRO.mp4"),
            transition_path: PathBuf::from("assets/videos/TRANSI.mp4"),
            font_path: bestof_media::overlay::DEFAULT_FONT_PATH.to_string(),
            profile: OutputProfile::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl TimelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let profile = OutputProfile::new(
            env_parse("BESTOF_OUTPUT_WIDTH", defaults.profile.width),
            env_parse("BESTOF_OUTPUT_HEIGHT", defaults.profile.height),
            env_parse("BESTOF_OUTPUT_FPS", defaults.profile.fps),
        );

        let mut encoding = defaults
            .encoding
            .clone()
            .with_crf(env_parse("BESTOF_CRF", defaults.encoding.crf));
        if let Ok(preset) = std::env::var("BESTOF_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            intro_path: env_path("BESTOF_INTRO_PATH", &defaults.intro_path),
            outro_path: env_path("BESTOF_OUTRO_PATH", &defaults.outro_path),
            transition_path: env_path("BESTOF_TRANSITION_PATH", &defaults.transition_path),
            font_path: std::env::var("BESTOF_FONT_PATH").unwrap_or(defaults.font_path),
            profile,
            encoding,
        }
    }

    /// Resolve the optional assets that exist on disk.
    pub fn assets(&self) -> TimelineAssets {
        TimelineAssets::resolve(&self.intro_path, &self.outro_path, &self.transition_path)
    }

    pub fn caption(&self) -> CaptionConfig {
        CaptionConfig::default().with_font(&self.font_path)
    }

    pub fn assembler(&self) -> TimelineAssembler {
        TimelineAssembler::new(
            self.profile,
            self.encoding.clone(),
            self.caption(),
            self.assets(),
        )
    }
}

/// Split a comma-separated term list, dropping blanks.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default", raw, name);
            default
        }),
        Err(_) => default,
    }
}

fn env_path(name: &str, default: &Path) -> PathBuf {
    std::env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default.to_path_buf())
}
