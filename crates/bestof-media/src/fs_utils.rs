//! Filesystem helpers for staged outputs.
//!
//! Everything the pipeline publishes (the assembled video, the metadata
//! record, the tracker file) is first written next to its final location and
//! then renamed into place, so readers never observe a half-written file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// A plain rename is tried first. If the staging directory lives on another
/// filesystem (EXDEV) the file is copied next to `dst` and renamed over it.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, falling back to copy: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Replace `path` with `contents` in one step.
///
/// The bytes go to a sibling `.<name>.tmp` file which is then renamed over
/// `path`; on failure the previous file (if any) is left untouched.
pub async fn write_atomic(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> MediaResult<()> {
    let path = path.as_ref();
    ensure_parent(path).await?;

    let tmp = staging_sibling(path);
    if let Err(e) = fs::write(&tmp, contents.as_ref()).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    Ok(())
}

/// Size of a file in megabytes, for progress lines.
pub async fn file_size_mb(path: impl AsRef<Path>) -> MediaResult<f64> {
    let meta = fs::metadata(path.as_ref()).await?;
    Ok(meta.len() as f64 / (1024.0 * 1024.0))
}

async fn ensure_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn staging_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// EXDEV is 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = staging_sibling(dst);

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to copy {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!("Failed to remove {} after move: {}", src.display(), e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("01_abc.mkv");
        let dst = dir.path().join("nested").join("01_abc.mp4");

        fs::write(&src, b"clip").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"clip");
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracked_streamers.json");

        write_atomic(&path, b"[\"a\"]").await.unwrap();
        write_atomic(&path, b"[\"a\",\"b\"]").await.unwrap();

        assert_eq!(fs::read_to_string(&path).await.unwrap(), "[\"a\",\"b\"]");
        assert!(!staging_sibling(&path).exists());
    }

    #[tokio::test]
    async fn test_write_atomic_keeps_previous_file_on_failure() {
        let dir = TempDir::new().unwrap();
        // A directory at the target makes the final rename fail.
        let path = dir.path().join("record.json");
        fs::create_dir(&path).await.unwrap();

        assert!(write_atomic(&path, b"{}").await.is_err());
        assert!(path.is_dir());
        assert!(!staging_sibling(&path).exists());
    }

    #[test]
    fn test_staging_sibling_is_hidden() {
        let tmp = staging_sibling(Path::new("bestof/bestof_2025-03-02.mp4"));
        assert_eq!(tmp, Path::new("bestof/.bestof_2025-03-02.mp4.tmp"));
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
