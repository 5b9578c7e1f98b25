//! Live-stream monitor feeding the streamer tracker.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bestof_twitch::{ClipSource, StreamQuery};

use crate::config::BestOfConfig;
use crate::error::WorkerResult;
use crate::tracker::StreamerTracker;

pub struct StreamerMonitor {
    source: Arc<dyn ClipSource>,
    tracker: StreamerTracker,
    query: StreamQuery,
    interval: std::time::Duration,
}

impl StreamerMonitor {
    pub fn new(source: Arc<dyn ClipSource>, config: &BestOfConfig) -> Self {
        let query = StreamQuery::new(config.game_id.clone(), config.search_terms.clone())
            .with_page_size(config.stream_page_size)
            .with_max_matches(config.max_streamers_per_check);

        Self {
            source,
            tracker: StreamerTracker::new(config.tracker_path()),
            query,
            interval: config.poll_interval,
        }
    }

    pub fn tracker(&self) -> &StreamerTracker {
        &self.tracker
    }

    /// One check: list matching live streams and record their broadcasters.
    ///
    /// Returns the number of newly tracked streamers.
    pub async fn poll_once(&self) -> WorkerResult<usize> {
        let streams = self.source.fetch_live_streams(&self.query).await?;

        for stream in &streams {
            debug!(
                streamer = %stream.user_name,
                terms = ?stream.matched_terms,
                "Matching stream: {}", stream.title
            );
        }
        info!("{} matching live streams", streams.len());

        self.tracker
            .record(streams.into_iter().map(|s| s.user_name))
            .await
    }

    /// Poll until `cancel` fires, first check immediately.
    ///
    /// A failed check is logged and the source asked to reconnect before the
    /// next one; the loop itself never stops on error.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Monitoring game {} every {}s",
            self.query.game_id,
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Monitor stopping");
                    return;
                }
                result = self.poll_once() => result,
            };

            if let Err(e) = result {
                warn!("Stream check failed: {}; reconnecting before the next one", e);
                self.source.reconnect().await;
            }
        }
    }
}
