//! Timeline assembly: intro, captioned clips, transitions and outro rendered
//! to one output profile, then joined with the concat demuxer.
//!
//! Every segment is re-encoded into a staging directory next to the output
//! with identical codec parameters, so the final join is a stream copy. The
//! finished file is moved to the output path only after the join succeeds;
//! a failed assembly never leaves anything at the output path.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use bestof_models::{DownloadedClip, EncodingConfig, OutputProfile};

use crate::command::{run_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::filters::{build_segment_graph, silent_audio_source};
use crate::fs_utils::{file_size_mb, move_file};
use crate::overlay::{build_caption_filter, caption_text, CaptionConfig};
use crate::probe::{get_duration, probe_video, VideoInfo};

/// Optional footage framing the clips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineAssets {
    pub intro: Option<PathBuf>,
    pub outro: Option<PathBuf>,
    pub transition: Option<PathBuf>,
}

impl TimelineAssets {
    /// Keep each asset only if its file exists; missing ones are logged.
    pub fn resolve(
        intro: impl AsRef<Path>,
        outro: impl AsRef<Path>,
        transition: impl AsRef<Path>,
    ) -> Self {
        Self {
            intro: existing("intro", intro.as_ref()),
            outro: existing("outro", outro.as_ref()),
            transition: existing("transition", transition.as_ref()),
        }
    }
}

fn existing(kind: &str, path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        warn!("No {} video at {}, assembling without it", kind, path.display());
        None
    }
}

/// One part of the assembled video.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Intro(PathBuf),
    Clip { path: PathBuf, broadcaster_name: String },
    Transition(PathBuf),
    Outro(PathBuf),
}

impl Segment {
    pub fn source(&self) -> &Path {
        match self {
            Self::Intro(p) | Self::Transition(p) | Self::Outro(p) => p,
            Self::Clip { path, .. } => path,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Intro(_) => "intro",
            Self::Clip { .. } => "clip",
            Self::Transition(_) => "transition",
            Self::Outro(_) => "outro",
        }
    }
}

/// Lay out the timeline: intro, clips in the given order, outro, with the
/// transition between every pair of adjacent parts.
pub fn plan_timeline(clips: &[DownloadedClip], assets: &TimelineAssets) -> Vec<Segment> {
    let mut parts = Vec::with_capacity(clips.len() + 2);

    if let Some(intro) = &assets.intro {
        parts.push(Segment::Intro(intro.clone()));
    }
    parts.extend(clips.iter().map(|clip| Segment::Clip {
        path: clip.path.clone(),
        broadcaster_name: clip.broadcaster_name.clone(),
    }));
    if let Some(outro) = &assets.outro {
        parts.push(Segment::Outro(outro.clone()));
    }

    let Some(transition) = &assets.transition else {
        return parts;
    };

    let mut timeline = Vec::with_capacity(parts.len() * 2);
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            timeline.push(Segment::Transition(transition.clone()));
        }
        timeline.push(part);
    }
    timeline
}

/// Result of an assembly attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyOutcome {
    Completed {
        path: PathBuf,
        size_bytes: u64,
        /// Ids of the clips in the video, in order
        clip_ids: Vec<String>,
    },
    Failed { reason: String },
}

impl AssemblyOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Turns downloaded clips into one video file.
#[async_trait]
pub trait Assembler: Send + Sync {
    /// Assemble `clips` (in order) into `output`.
    ///
    /// Clips that cannot be used are left out and missing from the
    /// completed outcome's `clip_ids`. Never returns an error: failures are
    /// reported as [`AssemblyOutcome::Failed`] and leave `output` untouched.
    async fn assemble(&self, clips: &[DownloadedClip], output: &Path) -> AssemblyOutcome;

    /// Duration of the intro in seconds, 0 when there is none.
    async fn intro_duration(&self) -> f64;
}

/// FFmpeg-backed [`Assembler`].
#[derive(Debug, Clone)]
pub struct TimelineAssembler {
    profile: OutputProfile,
    encoding: EncodingConfig,
    caption: CaptionConfig,
    assets: TimelineAssets,
}

impl TimelineAssembler {
    pub fn new(
        profile: OutputProfile,
        encoding: EncodingConfig,
        caption: CaptionConfig,
        assets: TimelineAssets,
    ) -> Self {
        Self {
            profile,
            encoding,
            caption,
            assets,
        }
    }

    pub fn assets(&self) -> &TimelineAssets {
        &self.assets
    }

    async fn try_assemble(
        &self,
        clips: &[DownloadedClip],
        output: &Path,
    ) -> MediaResult<(u64, Vec<String>)> {
        let start = Instant::now();

        let valid = usable_clips(clips).await;
        if valid.is_empty() {
            return Err(MediaError::EmptyTimeline);
        }

        let out_dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&out_dir).await?;
        let staging = tempfile::Builder::new()
            .prefix(".assembly-")
            .tempdir_in(&out_dir)?;

        info!(
            "Rendering {} clips at {}x{}@{}",
            valid.len(),
            self.profile.width,
            self.profile.height,
            self.profile.fps
        );

        let rendered_clips = self.render_clips(&valid, staging.path()).await;
        if rendered_clips.is_empty() {
            return Err(MediaError::EmptyTimeline);
        }

        let assets = self.usable_assets().await;
        let rendered_assets = TimelineAssets {
            intro: self
                .render_asset(assets.intro, Segment::Intro, staging.path())
                .await?,
            outro: self
                .render_asset(assets.outro, Segment::Outro, staging.path())
                .await?,
            transition: self
                .render_asset(assets.transition, Segment::Transition, staging.path())
                .await?,
        };

        // Every segment source is now a rendered file; the transition file is
        // listed once per gap.
        let rendered: Vec<PathBuf> = plan_timeline(&rendered_clips, &rendered_assets)
            .iter()
            .map(|segment| segment.source().to_path_buf())
            .collect();

        let joined = staging.path().join("joined.mp4");
        concatenate(&rendered, &joined, staging.path()).await?;
        move_file(&joined, output).await?;

        let size_bytes = tokio::fs::metadata(output).await?.len();
        info!(
            "Assembled {} from {} segments in {:.1}s ({:.2} MB)",
            output.display(),
            rendered.len(),
            start.elapsed().as_secs_f64(),
            file_size_mb(output).await?
        );

        let clip_ids = rendered_clips.into_iter().map(|c| c.clip_id).collect();
        Ok((size_bytes, clip_ids))
    }

    /// Render each clip with its caption. A clip that cannot be probed or
    /// rendered is logged and left out; the others keep their order.
    async fn render_clips(&self, clips: &[DownloadedClip], staging: &Path) -> Vec<DownloadedClip> {
        let mut rendered = Vec::with_capacity(clips.len());

        for (index, clip) in clips.iter().enumerate() {
            let segment = Segment::Clip {
                path: clip.path.clone(),
                broadcaster_name: clip.broadcaster_name.clone(),
            };
            let target = staging.join(format!("{:03}_clip.mp4", index));

            match self.render_segment(&segment, &target, staging, index).await {
                Ok(()) => rendered.push(DownloadedClip {
                    path: target,
                    ..clip.clone()
                }),
                Err(e) => warn!(
                    clip_id = %clip.clip_id,
                    "Could not open clip {}, leaving it out: {}",
                    clip.path.display(),
                    e
                ),
            }
        }

        rendered
    }

    /// Render an intro, outro or transition once, normalized like the clips.
    async fn render_asset(
        &self,
        asset: Option<PathBuf>,
        segment: fn(PathBuf) -> Segment,
        staging: &Path,
    ) -> MediaResult<Option<PathBuf>> {
        let Some(path) = asset else {
            return Ok(None);
        };
        let segment = segment(path);
        let target = staging.join(format!("{}.mp4", segment.label()));
        self.render_segment(&segment, &target, staging, 0).await?;
        Ok(Some(target))
    }

    /// Assets that exist at assembly time and probe as video.
    async fn usable_assets(&self) -> TimelineAssets {
        async fn check(kind: &str, path: &Option<PathBuf>) -> Option<PathBuf> {
            let path = path.as_ref()?;
            match probe_video(path).await {
                Ok(_) => Some(path.clone()),
                Err(e) => {
                    warn!("Skipping {} {}: {}", kind, path.display(), e);
                    None
                }
            }
        }

        TimelineAssets {
            intro: check("intro", &self.assets.intro).await,
            outro: check("outro", &self.assets.outro).await,
            transition: check("transition", &self.assets.transition).await,
        }
    }

    async fn render_segment(
        &self,
        segment: &Segment,
        target: &Path,
        staging: &Path,
        index: usize,
    ) -> MediaResult<()> {
        let source = segment.source();
        let info = probe_video(source).await?;

        let caption = match segment {
            Segment::Clip {
                broadcaster_name, ..
            } => {
                let text_file = staging.join(format!("{:03}_caption.txt", index));
                tokio::fs::write(&text_file, caption_text(broadcaster_name)).await?;
                Some(build_caption_filter(&self.caption, &text_file))
            }
            _ => None,
        };

        let cmd = self.segment_command(source, &info, caption.as_deref(), target);
        run_ffmpeg(&cmd).await.map_err(|e| {
            warn!(
                "Failed to render {} {}: {}",
                segment.label(),
                source.display(),
                e.stderr_tail().unwrap_or("no ffmpeg output")
            );
            e
        })
    }

    fn segment_command(
        &self,
        source: &Path,
        info: &VideoInfo,
        caption: Option<&str>,
        target: &Path,
    ) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(target).input(source);
        let audio_input = if info.has_audio {
            0
        } else {
            cmd = cmd.lavfi_input(silent_audio_source(&self.profile), Some(info.duration));
            1
        };

        cmd.filter_complex(build_segment_graph(&self.profile, caption, audio_input))
            .map("[v]")
            .map("[a]")
            .video_codec(&self.encoding.codec)
            .preset(&self.encoding.preset)
            .crf(self.encoding.crf)
            .frame_rate(self.profile.fps)
            .output_args(["-video_track_timescale", "90000"])
            .audio_codec(&self.encoding.audio_codec)
            .audio_bitrate(&self.encoding.audio_bitrate)
            .output_args(["-ar".to_string(), self.profile.sample_rate.to_string()])
            .output_args(["-ac", "2"])
            .shortest()
    }
}

#[async_trait]
impl Assembler for TimelineAssembler {
    async fn assemble(&self, clips: &[DownloadedClip], output: &Path) -> AssemblyOutcome {
        match self.try_assemble(clips, output).await {
            Ok((size_bytes, clip_ids)) => AssemblyOutcome::Completed {
                path: output.to_path_buf(),
                size_bytes,
                clip_ids,
            },
            Err(e) => {
                warn!("Assembly of {} failed: {}", output.display(), e);
                AssemblyOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn intro_duration(&self) -> f64 {
        let Some(intro) = &self.assets.intro else {
            return 0.0;
        };
        match get_duration(intro).await {
            Ok(duration) if duration.is_finite() && duration > 0.0 => duration,
            Ok(_) => 0.0,
            Err(e) => {
                warn!("Could not read intro duration from {}: {}", intro.display(), e);
                0.0
            }
        }
    }
}

/// Clips whose backing file exists and is not empty; others are logged and
/// dropped.
async fn usable_clips(clips: &[DownloadedClip]) -> Vec<DownloadedClip> {
    let mut valid = Vec::with_capacity(clips.len());
    for clip in clips {
        match tokio::fs::metadata(&clip.path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => valid.push(clip.clone()),
            _ => warn!(
                clip_id = %clip.clip_id,
                "Clip file {} is missing or empty, leaving it out",
                clip.path.display()
            ),
        }
    }
    valid
}

fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn concatenate(segments: &[PathBuf], output: &Path, staging: &Path) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::EmptyTimeline);
    }

    let list_path = staging.join("concat.txt");
    tokio::fs::write(&list_path, concat_list(segments)).await?;

    let cmd = FfmpegCommand::new(output)
        .concat_list_input(&list_path)
        .stream_copy()
        .faststart();
    run_ffmpeg(&cmd).await
}
