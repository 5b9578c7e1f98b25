//! Timecode utilities for the assembled video.

/// Format an offset in seconds as `mm:ss`.
///
/// Minutes are not wrapped into hours, so a 75 minute offset renders as
/// `75:00`. Fractional seconds are truncated.
///
/// # Examples
/// ```
/// use bestof_models::format_timecode;
/// assert_eq!(format_timecode(0.0), "00:00");
/// assert_eq!(format_timecode(65.9), "01:05");
/// assert_eq!(format_timecode(4500.0), "75:00");
/// ```
pub fn format_timecode(total_secs: f64) -> String {
    let total = if total_secs.is_finite() && total_secs > 0.0 {
        total_secs.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Compute the start offset of each clip in the assembled video.
///
/// The first clip starts right after the intro; each following clip starts
/// where the previous one ended.
pub fn cumulative_offsets<I>(intro_duration: f64, durations: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut current = intro_duration.max(0.0);
    durations
        .into_iter()
        .map(|duration| {
            let start = current;
            current += duration.max(0.0);
            start
        })
        .collect()
}
