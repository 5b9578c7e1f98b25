//! Persisted set of streamers discovered by the monitor.
//!
//! The file is a JSON array of display names. Names are only ever appended;
//! nothing in the pipeline removes a tracked streamer.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use bestof_media::write_atomic;

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

#[derive(Debug, Clone)]
pub struct StreamerTracker {
    path: PathBuf,
}

impl StreamerTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tracked names in insertion order.
    ///
    /// A missing or unreadable file yields an empty list; read errors are
    /// logged rather than returned.
    pub async fn load(&self) -> Vec<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<String>>(&bytes) {
            Ok(names) => dedupe(names),
            Err(e) => {
                warn!("Ignoring malformed tracker file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Merge `discovered` into the tracked set (exact, case-sensitive
    /// comparison) and return how many names were added.
    ///
    /// The file is rewritten only when something was added, and always as a
    /// whole through a temp file and rename.
    pub async fn record<I, S>(&self, discovered: I) -> WorkerResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracked = self.load().await;
        let before = tracked.len();

        for name in discovered {
            let name = name.into();
            if !name.is_empty() && !tracked.contains(&name) {
                tracked.push(name);
            }
        }

        let added = tracked.len() - before;
        if added == 0 {
            info!("No new streamers; tracking {}", tracked.len());
            return Ok(0);
        }

        let json = serde_json::to_vec(&tracked)?;
        write_atomic(&self.path, json).await.map_err(|e| {
            WorkerError::persistence_failed(format!("{}: {}", self.path.display(), e))
        })?;

        metrics::record_streamers_tracked(added);
        info!("Added {} streamers to the tracker (total {})", added, tracked.len());
        Ok(added)
    }
}

fn dedupe(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> StreamerTracker {
        StreamerTracker::new(dir.path().join("data").join("tracked_streamers.json"))
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(tracker(&dir).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tokio::fs::create_dir_all(tracker.path().parent().unwrap()).await.unwrap();
        tokio::fs::write(tracker.path(), b"{not json").await.unwrap();

        assert!(tracker.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_merges_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);

        assert_eq!(tracker.record(["Alice", "Bob"]).await.unwrap(), 2);
        assert_eq!(tracker.record(["Bob", "Carol", "alice"]).await.unwrap(), 2);

        assert_eq!(tracker.load().await, ["Alice", "Bob", "Carol", "alice"]);
        let raw = tokio::fs::read_to_string(tracker.path()).await.unwrap();
        assert_eq!(raw, r#"["Alice","Bob","Carol","alice"]"#);
    }

    #[tokio::test]
    async fn test_record_known_names_does_not_write() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tokio_test::assert_ok!(tracker.record(["Alice"]).await);

        // Replace the file with an equivalent but differently formatted list:
        // an idempotent record must leave it byte-for-byte untouched.
        tokio::fs::write(tracker.path(), b"[ \"Alice\" ]").await.unwrap();
        assert_eq!(tracker.record(["Alice"]).await.unwrap(), 0);
        assert_eq!(
            tokio::fs::read_to_string(tracker.path()).await.unwrap(),
            "[ \"Alice\" ]"
        );
    }

    #[tokio::test]
    async fn test_record_nothing_on_empty_input() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        assert_eq!(tracker.record(Vec::<String>::new()).await.unwrap(), 0);
        assert!(!tracker.path().exists());
    }
}
