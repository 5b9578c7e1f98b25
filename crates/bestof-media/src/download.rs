//! Clip download using yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;

/// Hosts that serve clip pages yt-dlp knows how to extract.
const PLATFORM_HOSTS: &[&str] = &["clips.twitch.tv", "www.twitch.tv", "twitch.tv"];

/// Downloads a clip page URL to a local media file.
#[async_trait]
pub trait ClipDownloader: Send + Sync {
    /// Download `url` so that the media ends up exactly at `destination`.
    async fn download(&self, url: &str, destination: &Path) -> MediaResult<()>;
}

/// Whether `url` looks like an https clip link on the streaming platform.
pub fn is_platform_clip_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            parsed.scheme() == "https"
                && parsed
                    .host_str()
                    .map(|host| PLATFORM_HOSTS.contains(&host))
                    .unwrap_or(false)
        }
        Err(_) => false,
    }
}

/// [`ClipDownloader`] backed by the `yt-dlp` executable.
#[derive(Debug, Clone, Default)]
pub struct YtDlpDownloader {
    extra_args: Vec<String>,
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra arguments placed before the output option (e.g. `--cookies`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    fn build_args(&self, url: &str, destination: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["--no-playlist", "--geo-bypass", "--no-warnings"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.extra_args.iter().cloned());
        args.push("-o".to_string());
        args.push(destination.to_string_lossy().to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl ClipDownloader for YtDlpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> MediaResult<()> {
        check_ytdlp()?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Downloading clip {} to {}", url, destination.display());

        let output = Command::new("yt-dlp")
            .args(self.build_args(url, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::download_failed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or_default()
            )));
        }

        if destination.exists() {
            return Ok(());
        }

        match find_alternate_output(destination).await? {
            Some(found) => {
                debug!(
                    "yt-dlp wrote {} instead of {}, moving into place",
                    found.display(),
                    destination.display()
                );
                move_file(&found, destination).await
            }
            None => Err(MediaError::download_failed(format!(
                "yt-dlp reported success but {} is missing",
                destination.display()
            ))),
        }
    }
}

/// Look for a file sharing `destination`'s stem but with another extension.
async fn find_alternate_output(destination: &Path) -> MediaResult<Option<PathBuf>> {
    let Some(stem) = destination.file_stem() else {
        return Ok(None);
    };
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut entries = tokio::fs::read_dir(&dir).await?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path == destination || !entry.file_type().await?.is_file() {
            continue;
        }
        if path.file_stem() == Some(stem) {
            candidates.push(path);
        }
    }

    candidates.sort();
    Ok(candidates.into_iter().next())
}
