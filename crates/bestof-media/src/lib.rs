#![deny(unreachable_patterns)]
//! FFmpeg and yt-dlp wrappers for best-of assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - FFprobe media inspection
//! - Clip downloads through yt-dlp behind the [`ClipDownloader`] trait
//! - Caption overlays and per-segment normalization filters
//! - The [`TimelineAssembler`] joining intro, clips, transitions and outro

pub mod assembler;
pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod overlay;
pub mod probe;

pub use assembler::{
    plan_timeline, Assembler, AssemblyOutcome, Segment, TimelineAssembler, TimelineAssets,
};
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, run_ffmpeg, FfmpegCommand};
pub use download::{is_platform_clip_url, ClipDownloader, YtDlpDownloader};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{file_size_mb, move_file, write_atomic};
pub use overlay::{caption_text, CaptionConfig, CAPTION_PLACEHOLDER};
pub use probe::{get_duration, probe_video, VideoInfo};
