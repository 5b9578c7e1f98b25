//! Generation runs against in-memory collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::TempDir;

use bestof_media::{Assembler, AssemblyOutcome, ClipDownloader, MediaError, MediaResult};
use bestof_models::{BestOfRecord, Clip, DownloadedClip};
use bestof_twitch::{
    ClipQuery, ClipScope, ClipSource, LiveStream, StreamQuery, TwitchError, TwitchResult,
};
use bestof_worker::{
    BestOfConfig, BestOfGenerator, DuplicatePolicy, RunOutcome, StreamerTracker,
};

struct FakeSource {
    clips: HashMap<String, Vec<Clip>>,
}

#[async_trait]
impl ClipSource for FakeSource {
    async fn fetch_clips(&self, query: &ClipQuery) -> TwitchResult<Vec<Clip>> {
        match &query.scope {
            ClipScope::Broadcaster(id) => Ok(self.clips.get(id).cloned().unwrap_or_default()),
            ClipScope::Game(_) => Ok(Vec::new()),
        }
    }

    async fn fetch_live_streams(&self, _query: &StreamQuery) -> TwitchResult<Vec<LiveStream>> {
        Ok(Vec::new())
    }

    async fn resolve_broadcaster_id(&self, name: &str) -> TwitchResult<String> {
        if self.clips.contains_key(name) {
            Ok(name.to_string())
        } else {
            Err(TwitchError::NotFound(name.to_string()))
        }
    }

    async fn reconnect(&self) {}
}

#[derive(Default)]
struct FakeDownloader {
    fail_all: bool,
}

#[async_trait]
impl ClipDownloader for FakeDownloader {
    async fn download(&self, url: &str, destination: &Path) -> MediaResult<()> {
        if self.fail_all {
            return Err(MediaError::download_failed(format!("{url}: unavailable")));
        }
        tokio::fs::write(destination, url.as_bytes()).await?;
        Ok(())
    }
}

#[derive(Default)]
struct FakeAssembler {
    fail: bool,
    /// Clips the assembler cannot open
    unreadable: Vec<&'static str>,
    received: Mutex<Vec<DownloadedClip>>,
}

#[async_trait]
impl Assembler for FakeAssembler {
    async fn assemble(&self, clips: &[DownloadedClip], output: &Path) -> AssemblyOutcome {
        self.received.lock().unwrap().extend_from_slice(clips);
        for clip in clips {
            assert!(clip.path.exists(), "clip file missing during assembly");
        }
        if self.fail {
            return AssemblyOutcome::Failed {
                reason: "encoder crashed".to_string(),
            };
        }
        tokio::fs::write(output, b"video").await.unwrap();
        AssemblyOutcome::Completed {
            path: output.to_path_buf(),
            size_bytes: 5,
            clip_ids: clips
                .iter()
                .map(|c| c.clip_id.clone())
                .filter(|id| !self.unreadable.contains(&id.as_str()))
                .collect(),
        }
    }

    async fn intro_duration(&self) -> f64 {
        5.0
    }
}

fn clip(id: &str, broadcaster: &str, views: u64, hour: u32) -> Clip {
    Clip {
        id: id.to_string(),
        url: format!("https://clips.twitch.tv/{id}"),
        title: format!("{broadcaster} clip {id}"),
        broadcaster_name: broadcaster.to_string(),
        thumbnail_url: String::new(),
        view_count: views,
        created_at: Utc.with_ymd_and_hms(2025, 2, 27, hour, 0, 0).unwrap(),
        duration: 30.0,
    }
}

fn three_streamers() -> FakeSource {
    let mut clips = HashMap::new();
    clips.insert(
        "A".to_string(),
        vec![clip("a100", "A", 100, 15), clip("a50", "A", 50, 9)],
    );
    clips.insert("B".to_string(), vec![clip("b200", "B", 200, 12)]);
    clips.insert("C".to_string(), vec![clip("c10", "C", 10, 8)]);
    FakeSource { clips }
}

fn config(dir: &TempDir) -> BestOfConfig {
    BestOfConfig {
        total_bestof_clips: 2,
        data_dir: dir.path().join("data"),
        output_dir: dir.path().join("bestof"),
        streamer_delay: Duration::ZERO,
        download_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
}

async fn track(config: &BestOfConfig, names: &[&str]) {
    StreamerTracker::new(config.tracker_path())
        .record(names.iter().copied())
        .await
        .unwrap();
}

fn staging_dirs(output_dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(output_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("temp-"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn generator(
    source: FakeSource,
    downloader: FakeDownloader,
    assembler: Arc<FakeAssembler>,
    config: BestOfConfig,
) -> BestOfGenerator {
    BestOfGenerator::new(Arc::new(source), Arc::new(downloader), assembler, config)
}

#[tokio::test]
async fn test_most_viewed_clips_in_chronological_order() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["A", "B", "C"]).await;

    let assembler = Arc::new(FakeAssembler::default());
    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        assembler.clone(),
        config.clone(),
    )
    .run(date())
    .await;

    let RunOutcome::Completed {
        record,
        video_path,
        metadata_path,
    } = outcome
    else {
        panic!("expected a completed run, got {outcome:?}");
    };

    let ids: Vec<_> = record.clips.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["b200", "a100"]);
    assert_eq!(record.youtube_title, "B clip b200 - BEST OF DU 02/03/2025");
    assert_eq!(record.total_views, 300);

    let timecodes: Vec<_> = record.clips.iter().map(|c| c.timecode.as_str()).collect();
    assert_eq!(timecodes, ["00:05", "00:35"]);

    let assembled: Vec<_> = assembler
        .received
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.broadcaster_name.clone())
        .collect();
    assert_eq!(assembled, ["B", "A"]);

    assert_eq!(video_path, config.output_dir.join("bestof_2025-03-02.mp4"));
    let metadata_path = metadata_path.expect("metadata written");
    assert_eq!(
        metadata_path,
        config.output_dir.join("bestof_2025-03-02_metadata.json")
    );
    let stored: BestOfRecord =
        serde_json::from_slice(&std::fs::read(&metadata_path).unwrap()).unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_staging_directory_removed_after_success() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["A", "B"]).await;

    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        Arc::new(FakeAssembler::default()),
        config.clone(),
    )
    .run(date())
    .await;

    assert!(outcome.is_completed());
    assert!(staging_dirs(&config.output_dir).is_empty());
}

#[tokio::test]
async fn test_staging_directory_removed_after_assembly_failure() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["A", "B"]).await;

    let assembler = Arc::new(FakeAssembler {
        fail: true,
        ..Default::default()
    });
    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        assembler,
        config.clone(),
    )
    .run(date())
    .await;

    assert_eq!(
        outcome,
        RunOutcome::AssemblyFailed {
            reason: "encoder crashed".to_string()
        }
    );
    assert!(staging_dirs(&config.output_dir).is_empty());
    assert!(!config.output_dir.join("bestof_2025-03-02_metadata.json").exists());
}

#[tokio::test]
async fn test_no_downloads_halts_run() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["A"]).await;

    let assembler = Arc::new(FakeAssembler::default());
    let outcome = generator(
        three_streamers(),
        FakeDownloader { fail_all: true },
        assembler.clone(),
        config.clone(),
    )
    .run(date())
    .await;

    assert_eq!(outcome, RunOutcome::NoDownloads);
    assert!(assembler.received.lock().unwrap().is_empty());
    assert!(staging_dirs(&config.output_dir).is_empty());
}

#[tokio::test]
async fn test_empty_tracker_halts_run() {
    let dir = TempDir::new().unwrap();
    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        Arc::new(FakeAssembler::default()),
        config(&dir),
    )
    .run(date())
    .await;

    assert_eq!(outcome, RunOutcome::NoStreamers);
}

#[tokio::test]
async fn test_unknown_streamers_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["ghost", "C"]).await;

    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        Arc::new(FakeAssembler::default()),
        config,
    )
    .run(date())
    .await;

    let RunOutcome::Completed { record, .. } = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(record.clips_count, 1);
    assert_eq!(record.clips[0].broadcaster, "C");
}

#[tokio::test]
async fn test_only_unknown_streamers_yield_no_clips() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["ghost"]).await;

    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        Arc::new(FakeAssembler::default()),
        config,
    )
    .run(date())
    .await;

    assert_eq!(outcome, RunOutcome::NoClips);
}

#[tokio::test]
async fn test_drop_by_id_policy_removes_duplicate_clips() {
    let dir = TempDir::new().unwrap();
    let config = BestOfConfig {
        duplicate_policy: DuplicatePolicy::DropById,
        ..config(&dir)
    };
    track(&config, &["A", "B"]).await;

    let shared = clip("shared", "A", 500, 10);
    let mut clips = HashMap::new();
    clips.insert("A".to_string(), vec![shared.clone(), clip("a1", "A", 1, 11)]);
    clips.insert("B".to_string(), vec![shared]);

    let outcome = generator(
        FakeSource { clips },
        FakeDownloader::default(),
        Arc::new(FakeAssembler::default()),
        config,
    )
    .run(date())
    .await;

    let RunOutcome::Completed { record, .. } = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    let ids: Vec<_> = record.clips.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["shared", "a1"]);
}

#[tokio::test]
async fn test_clips_left_out_by_assembler_are_not_described() {
    let dir = TempDir::new().unwrap();
    let config = BestOfConfig {
        total_bestof_clips: 3,
        ..config(&dir)
    };
    track(&config, &["A", "B"]).await;

    let assembler = Arc::new(FakeAssembler {
        unreadable: vec!["a50"],
        ..Default::default()
    });
    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        assembler.clone(),
        config,
    )
    .run(date())
    .await;

    let RunOutcome::Completed { record, .. } = outcome else {
        panic!("expected a completed run, got {outcome:?}");
    };
    assert_eq!(assembler.received.lock().unwrap().len(), 3);

    let ids: Vec<_> = record.clips.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["b200", "a100"]);
    let timecodes: Vec<_> = record.clips.iter().map(|c| c.timecode.as_str()).collect();
    assert_eq!(timecodes, ["00:05", "00:35"]);
    assert_eq!(record.clips_count, 2);
    assert_eq!(record.total_views, 300);
}

#[tokio::test]
async fn test_zero_clip_budget_halts_before_downloading() {
    let dir = TempDir::new().unwrap();
    let config = BestOfConfig {
        total_bestof_clips: 0,
        ..config(&dir)
    };
    track(&config, &["A"]).await;

    let assembler = Arc::new(FakeAssembler::default());
    let outcome = generator(
        three_streamers(),
        FakeDownloader::default(),
        assembler.clone(),
        config.clone(),
    )
    .run(date())
    .await;

    assert_eq!(outcome, RunOutcome::NoClips);
    assert!(assembler.received.lock().unwrap().is_empty());
    assert!(!config.output_dir.exists());
}

/// Writes the file, then never finishes.
struct StalledDownloader;

#[async_trait]
impl ClipDownloader for StalledDownloader {
    async fn download(&self, _url: &str, destination: &Path) -> MediaResult<()> {
        tokio::fs::write(destination, b"partial").await?;
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test]
async fn test_interrupted_run_removes_staging_directory() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    track(&config, &["A", "B"]).await;

    let generator = BestOfGenerator::new(
        Arc::new(three_streamers()),
        Arc::new(StalledDownloader),
        Arc::new(FakeAssembler::default()),
        config.clone(),
    );

    let cancel = tokio_util::sync::CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let finished = tokio::select! {
        _ = generator.run(date()) => true,
        _ = cancel.cancelled() => false,
    };

    assert!(!finished);
    assert!(config.output_dir.exists());
    assert!(staging_dirs(&config.output_dir).is_empty());
}
