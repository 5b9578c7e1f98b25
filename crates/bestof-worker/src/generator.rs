//! Weekly best-of generation run.
//!
//! Tracked streamers are queried one by one for their recent clips, the most
//! viewed clips are kept and put back in chronological order, downloaded into
//! a staging directory, assembled into one video and described by a metadata
//! record. Every early exit and every failure is reported through
//! [`RunOutcome`]; nothing propagates past the run.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn, Instrument};

use bestof_media::{Assembler, AssemblyOutcome, ClipDownloader};
use bestof_models::{BestOfRecord, Clip};
use bestof_twitch::{
    sanitize_broadcaster_name, ClipQuery, ClipScope, ClipSource, TimeWindow, TwitchError,
    MAX_PAGE_SIZE,
};

use crate::config::BestOfConfig;
use crate::error::WorkerResult;
use crate::fetcher::{ClipFetcher, FetchedClip};
use crate::logging::RunLogger;
use crate::metadata::{bestof_video_path, build_record, metadata_path, write_record};
use crate::metrics;
use crate::selector::{by_popularity, log_selection, select_clips};
use crate::tracker::StreamerTracker;

const STAGING_PREFIX: &str = "temp-";

/// How a generation run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoStreamers,
    NoClips,
    NoDownloads,
    AssemblyFailed {
        reason: String,
    },
    Completed {
        record: BestOfRecord,
        video_path: PathBuf,
        /// `None` when the metadata file could not be written
        metadata_path: Option<PathBuf>,
    },
}

impl RunOutcome {
    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoStreamers => "no_streamers",
            Self::NoClips => "no_clips",
            Self::NoDownloads => "no_downloads",
            Self::AssemblyFailed { .. } => "assembly_failed",
            Self::Completed { .. } => "completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

pub struct BestOfGenerator {
    source: Arc<dyn ClipSource>,
    assembler: Arc<dyn Assembler>,
    fetcher: ClipFetcher,
    tracker: StreamerTracker,
    config: BestOfConfig,
}

impl BestOfGenerator {
    pub fn new(
        source: Arc<dyn ClipSource>,
        downloader: Arc<dyn ClipDownloader>,
        assembler: Arc<dyn Assembler>,
        config: BestOfConfig,
    ) -> Self {
        Self {
            source,
            assembler,
            fetcher: ClipFetcher::new(downloader, config.download_delay),
            tracker: StreamerTracker::new(config.tracker_path()),
            config,
        }
    }

    pub fn config(&self) -> &BestOfConfig {
        &self.config
    }

    /// Generate the best-of for `date`.
    pub async fn run(&self, date: NaiveDate) -> RunOutcome {
        let logger = RunLogger::new(date.format("%Y-%m-%d").to_string(), "bestof");
        let span = logger.create_span();

        let outcome = self.run_inner(date, &logger).instrument(span).await;
        metrics::record_run(outcome.label());
        outcome
    }

    async fn run_inner(&self, date: NaiveDate, logger: &RunLogger) -> RunOutcome {
        logger.log_start(&format!(
            "{} clips, up to {} per streamer",
            self.config.total_bestof_clips, self.config.max_clips_per_streamer
        ));

        let streamers = self.tracker.load().await;
        if streamers.is_empty() {
            logger.log_warning("No tracked streamers; nothing to do");
            return RunOutcome::NoStreamers;
        }
        logger.log_progress(&format!("Gathering clips from {} streamers", streamers.len()));

        let clips = self.gather_clips(&streamers).await;
        if clips.is_empty() {
            logger.log_warning("No clips found for the tracked streamers");
            return RunOutcome::NoClips;
        }

        log_selection(
            &format!("Top clips by views ({} found):", clips.len()),
            &by_popularity(&clips),
        );
        let selected = select_clips(
            clips,
            self.config.total_bestof_clips,
            self.config.duplicate_policy,
        );
        if selected.is_empty() {
            logger.log_warning("No clip selected");
            return RunOutcome::NoClips;
        }
        log_selection(
            &format!("Selected {} clips in chronological order:", selected.len()),
            &selected,
        );

        match self.assemble(&selected, date, logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                logger.log_error(&format!("Could not prepare the output directory: {}", e));
                RunOutcome::AssemblyFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Clips of every streamer, in streamer order. A streamer whose lookup
    /// or clip listing fails is skipped.
    async fn gather_clips(&self, streamers: &[String]) -> Vec<Clip> {
        let mut clips = Vec::new();

        for (i, name) in streamers.iter().enumerate() {
            if i > 0 && !self.config.streamer_delay.is_zero() {
                tokio::time::sleep(self.config.streamer_delay).await;
            }

            match self.streamer_clips(name).await {
                Ok(found) => {
                    info!(streamer = %name, "{} clips", found.len());
                    metrics::record_clips_fetched(found.len());
                    clips.extend(found);
                }
                Err(TwitchError::NotFound(_)) | Err(TwitchError::InvalidName(_)) => {
                    warn!(streamer = %name, "Streamer not found, skipping");
                }
                Err(e) => {
                    warn!(streamer = %name, "Could not fetch clips: {}", e);
                }
            }
        }

        clips
    }

    async fn streamer_clips(&self, name: &str) -> Result<Vec<Clip>, TwitchError> {
        let login = sanitize_broadcaster_name(name);
        let broadcaster_id = self.source.resolve_broadcaster_id(&login).await?;

        let max = self.config.max_clips_per_streamer;
        let query = ClipQuery::new(ClipScope::Broadcaster(broadcaster_id))
            .with_window(TimeWindow::last_days(self.config.clip_window_days))
            .with_page_size(u32::try_from(max).unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE))
            .with_max_clips(max);

        self.source.fetch_clips(&query).await
    }

    /// Download `selected` into a staging directory and assemble the video.
    ///
    /// The staging directory is removed when this returns, whatever the
    /// outcome.
    async fn assemble(
        &self,
        selected: &[Clip],
        date: NaiveDate,
        logger: &RunLogger,
    ) -> WorkerResult<RunOutcome> {
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir).await?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(output_dir)?;

        let fetched = self.fetcher.fetch_all(selected, staging.path()).await;
        if fetched.is_empty() {
            logger.log_warning("No clip could be downloaded");
            return Ok(RunOutcome::NoDownloads);
        }
        logger.log_progress(&format!(
            "Downloaded {}/{} clips",
            fetched.len(),
            selected.len()
        ));

        let video_path = bestof_video_path(output_dir, date);
        let files: Vec<_> = fetched.iter().map(|f| f.file.clone()).collect();

        let (size_bytes, clip_ids) = match self.assembler.assemble(&files, &video_path).await {
            AssemblyOutcome::Completed {
                size_bytes,
                clip_ids,
                ..
            } => (size_bytes, clip_ids),
            AssemblyOutcome::Failed { reason } => {
                logger.log_error(&format!("Assembly failed: {}", reason));
                return Ok(RunOutcome::AssemblyFailed { reason });
            }
        };

        let assembled = assembled_clips(&fetched, &clip_ids);
        if assembled.len() < fetched.len() {
            logger.log_warning(&format!(
                "{} downloaded clips were left out of the video",
                fetched.len() - assembled.len()
            ));
        }

        let intro_duration = self.assembler.intro_duration().await;
        let record = build_record(&assembled, intro_duration, date, &video_path);
        let record_path = metadata_path(output_dir, date);
        let metadata_path = match write_record(&record, &record_path).await {
            Ok(()) => Some(record_path),
            Err(e) => {
                logger.log_error(&format!("Could not write metadata: {}", e));
                None
            }
        };

        logger.log_completion(&format!(
            "{} ({} clips, {} views, {:.2} MB)",
            video_path.display(),
            record.clips_count,
            record.total_views,
            size_bytes as f64 / (1024.0 * 1024.0)
        ));

        Ok(RunOutcome::Completed {
            record,
            video_path,
            metadata_path,
        })
    }
}

/// The fetched clips the assembler reported, in video order.
///
/// `clip_ids` is matched as a subsequence of `fetched`, so repeated ids map to
/// successive records.
fn assembled_clips(fetched: &[FetchedClip], clip_ids: &[String]) -> Vec<Clip> {
    let mut remaining = fetched.iter();
    clip_ids
        .iter()
        .filter_map(|id| remaining.find(|f| &f.clip.id == id))
        .map(|f| f.clip.clone())
        .collect()
}
