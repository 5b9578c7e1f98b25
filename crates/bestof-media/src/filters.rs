//! Filter graphs normalizing every timeline segment to one output profile.
//!
//! Concatenating with `-c copy` only works when all segments agree on
//! resolution, frame rate, pixel format and audio layout.

use bestof_models::OutputProfile;

/// Letterbox into the profile frame, then fix SAR, frame rate and pixel format.
pub fn normalize_video_filter(profile: &OutputProfile) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,\
         setsar=1,fps={fps},format=yuv420p",
        w = profile.width,
        h = profile.height,
        fps = profile.fps
    )
}

/// Resample to the profile sample rate in stereo.
pub fn normalize_audio_filter(profile: &OutputProfile) -> String {
    format!(
        "aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo",
        profile.sample_rate
    )
}

/// Silent stereo source used for segments without an audio stream.
pub fn silent_audio_source(profile: &OutputProfile) -> String {
    format!(
        "anullsrc=channel_layout=stereo:sample_rate={}",
        profile.sample_rate
    )
}

/// Complete `-filter_complex` graph for one segment.
///
/// Video comes from input 0; audio from `audio_input` (0 for the clip's own
/// track, 1 for a silent lavfi input). Outputs are labelled `[v]` and `[a]`.
pub fn build_segment_graph(
    profile: &OutputProfile,
    caption: Option<&str>,
    audio_input: usize,
) -> String {
    let mut video_chain = normalize_video_filter(profile);
    if let Some(caption) = caption {
        video_chain.push(',');
        video_chain.push_str(caption);
    }

    format!(
        "[0:v]{}[v];[{}:a]{}[a]",
        video_chain,
        audio_input,
        normalize_audio_filter(profile)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_video_filter_default_profile() {
        let filter = normalize_video_filter(&OutputProfile::default());
        assert!(filter.starts_with("scale=1920:1080:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1920:1080:(ow-iw)/2:(oh-ih)/2"));
        assert!(filter.contains("setsar=1"));
        assert!(filter.contains("fps=60"));
        assert!(filter.ends_with("format=yuv420p"));
    }

    #[test]
    fn test_segment_graph_with_caption() {
        let graph = build_segment_graph(&OutputProfile::default(), Some("drawtext=text=x"), 0);
        assert!(graph.starts_with("[0:v]scale="));
        assert!(graph.contains("format=yuv420p,drawtext=text=x[v]"));
        assert!(graph.ends_with("[0:a]aresample=48000,aformat=sample_fmts=fltp:channel_layouts=stereo[a]"));
    }

    #[test]
    fn test_segment_graph_silent_audio_input() {
        let graph = build_segment_graph(&OutputProfile::new(1280, 720, 30), None, 1);
        assert!(graph.contains("fps=30,format=yuv420p[v]"));
        assert!(graph.contains("[1:a]aresample"));
    }

    #[test]
    fn test_silent_audio_source() {
        assert_eq!(
            silent_audio_source(&OutputProfile::default()),
            "anullsrc=channel_layout=stereo:sample_rate=48000"
        );
    }
}
