//! Resolve selected clips to local files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use bestof_media::{is_platform_clip_url, ClipDownloader};
use bestof_models::{Clip, DownloadedClip};

use crate::metrics;

/// A selected clip together with its local file.
#[derive(Debug, Clone)]
pub struct FetchedClip {
    pub clip: Clip,
    pub file: DownloadedClip,
}

/// Local file for the clip at `index` (0-based) of the final order.
///
/// The two-digit ordinal prefix keeps a directory listing in video order.
pub fn clip_file_path(dir: &Path, index: usize, clip_id: &str) -> PathBuf {
    let safe_id: String = clip_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    dir.join(format!("{:02}_{}.mp4", index + 1, safe_id))
}

pub struct ClipFetcher {
    downloader: Arc<dyn ClipDownloader>,
    delay: Duration,
}

impl ClipFetcher {
    pub fn new(downloader: Arc<dyn ClipDownloader>, delay: Duration) -> Self {
        Self { downloader, delay }
    }

    /// Fetch `clips` in order into `dir`.
    ///
    /// Files already present are reused. A failed download is logged and the
    /// clip left out; the result keeps the input order.
    pub async fn fetch_all(&self, clips: &[Clip], dir: &Path) -> Vec<FetchedClip> {
        let mut fetched = Vec::with_capacity(clips.len());

        for (index, clip) in clips.iter().enumerate() {
            let path = clip_file_path(dir, index, &clip.id);

            if path.exists() {
                info!(clip_id = %clip.id, "Reusing {}", path.display());
                metrics::record_clip_download("cached");
                fetched.push(FetchedClip {
                    clip: clip.clone(),
                    file: DownloadedClip::new(path, clip),
                });
                continue;
            }

            info!(
                clip_id = %clip.id,
                "Downloading clip {}/{}: {} ({} views)",
                index + 1,
                clips.len(),
                clip.title,
                clip.view_count
            );

            if !is_platform_clip_url(&clip.url) {
                warn!(clip_id = %clip.id, "URL {} may not be a Twitch clip", clip.url);
            }

            match self.downloader.download(&clip.url, &path).await {
                Ok(()) => {
                    metrics::record_clip_download("downloaded");
                    fetched.push(FetchedClip {
                        clip: clip.clone(),
                        file: DownloadedClip::new(path, clip),
                    });
                }
                Err(e) => {
                    metrics::record_clip_download("failed");
                    warn!(clip_id = %clip.id, "Download of {} failed: {}", clip.url, e);
                }
            }

            if index + 1 < clips.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        fetched
    }
}
