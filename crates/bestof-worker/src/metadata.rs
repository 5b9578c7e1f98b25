//! Best-of title, description and metadata file.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use bestof_media::write_atomic;
use bestof_models::{cumulative_offsets, format_timecode, BestOfRecord, Clip, ClipEntry};

use crate::error::{WorkerError, WorkerResult};

const DESCRIPTION_INTRO: &str = "Voici le best of du {date} j'espère qu'il vous plaira ! \n\
Ce best of est généré automatiquement en fonction des clips fait par les streamer du serveur, \
donc si un moment vous plait et vous pensez qu'il serait bien dans ce best of, il vous suffit \
de créer le clip et qu'il soit parmis les plus vu de la semaine ! \n\n\
Les clips de la semaine :\n";

const DESCRIPTION_OUTRO: &str = "\n\nSi quelque chose vous semble bizzare, n'hésitez pas à \
contacter @Wiibleyde sur les réseaux sociaux (Discord de préférence) ! \n\n\
Merci pour votre présence et à la semaine prochaine !";

/// `bestof_<YYYY-MM-DD>.mp4` under `dir`.
pub fn bestof_video_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("bestof_{}.mp4", date.format("%Y-%m-%d")))
}

/// `bestof_<YYYY-MM-DD>_metadata.json` under `dir`.
pub fn metadata_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("bestof_{}_metadata.json", date.format("%Y-%m-%d")))
}

/// The most viewed clip. On a tie the earliest one in `clips` wins.
pub fn headline_clip(clips: &[Clip]) -> Option<&Clip> {
    clips.iter().fold(None, |best: Option<&Clip>, clip| match best {
        Some(b) if b.view_count >= clip.view_count => Some(b),
        _ => Some(clip),
    })
}

pub fn build_title(clips: &[Clip], date: NaiveDate) -> String {
    let headline = headline_clip(clips).map(|c| c.title.as_str()).unwrap_or_default();
    format!("{} - BEST OF DU {}", headline, date.format("%d/%m/%Y"))
}

/// Description text listing `clips` with their timecodes.
///
/// `entries` must be the clips' entries in video order.
pub fn build_description(entries: &[ClipEntry], date: NaiveDate) -> String {
    let listing = entries
        .iter()
        .map(|e| format!("{} : {} - {}", e.timecode, e.broadcaster, e.title))
        .collect::<Vec<_>>()
        .join("\n");

    let mut description =
        DESCRIPTION_INTRO.replace("{date}", &date.format("%d/%m/%Y").to_string());
    description.push_str(&listing);
    description.push_str(DESCRIPTION_OUTRO);
    description
}

/// Build the record for `clips`, which must be in video order and match the
/// clips actually assembled.
pub fn build_record(
    clips: &[Clip],
    intro_duration: f64,
    date: NaiveDate,
    file_path: &Path,
) -> BestOfRecord {
    let offsets = cumulative_offsets(intro_duration, clips.iter().map(Clip::duration_secs));

    let entries: Vec<ClipEntry> = clips
        .iter()
        .zip(offsets)
        .map(|(clip, start)| ClipEntry::from_clip(clip, format_timecode(start)))
        .collect();

    BestOfRecord {
        date,
        youtube_title: build_title(clips, date),
        youtube_description: build_description(&entries, date),
        file_path: file_path.to_string_lossy().into_owned(),
        clips_count: entries.len(),
        total_views: clips.iter().map(|c| c.view_count).sum(),
        clips: entries,
    }
}

/// Write `record` as pretty JSON, replacing any record for the same date.
pub async fn write_record(record: &BestOfRecord, path: &Path) -> WorkerResult<()> {
    let json = serde_json::to_vec_pretty(record)?;
    write_atomic(path, json)
        .await
        .map_err(|e| WorkerError::persistence_failed(format!("{}: {}", path.display(), e)))?;
    info!("Metadata written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn clip(id: &str, broadcaster: &str, views: u64, hour: u32, duration: f64) -> Clip {
        Clip {
            id: id.to_string(),
            url: format!("https://clips.twitch.tv/{id}"),
            title: format!("Clip {id}"),
            broadcaster_name: broadcaster.to_string(),
            thumbnail_url: String::new(),
            view_count: views,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            duration,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
    }

    #[test]
    fn test_paths_are_keyed_by_date() {
        let dir = Path::new("bestof");
        assert_eq!(bestof_video_path(dir, date()), Path::new("bestof/bestof_2025-03-02.mp4"));
        assert_eq!(
            metadata_path(dir, date()),
            Path::new("bestof/bestof_2025-03-02_metadata.json")
        );
    }

    #[test]
    fn test_title_uses_most_viewed_clip() {
        let clips = vec![
            clip("a", "alice", 100, 1, 10.0),
            clip("b", "bob", 200, 2, 10.0),
            clip("c", "carol", 150, 3, 10.0),
        ];
        assert_eq!(build_title(&clips, date()), "Clip b - BEST OF DU 02/03/2025");
    }

    #[test]
    fn test_title_tie_prefers_earliest() {
        let clips = vec![clip("a", "alice", 50, 1, 10.0), clip("b", "bob", 50, 2, 10.0)];
        assert_eq!(headline_clip(&clips).unwrap().id, "a");
        assert!(headline_clip(&[]).is_none());
    }

    #[test]
    fn test_timecodes_start_after_intro() {
        let clips = vec![
            clip("a", "alice", 1, 1, 30.0),
            clip("b", "bob", 1, 2, 45.5),
            clip("c", "carol", 1, 3, 20.0),
        ];
        let record = build_record(&clips, 12.0, date(), Path::new("bestof/x.mp4"));

        let timecodes: Vec<_> = record.clips.iter().map(|e| e.timecode.as_str()).collect();
        assert_eq!(timecodes, ["00:12", "00:42", "01:27"]);
    }

    #[test]
    fn test_record_aggregates() {
        let clips = vec![clip("a", "alice", 100, 1, 10.0), clip("b", "bob", 200, 2, 10.0)];
        let record = build_record(&clips, 0.0, date(), Path::new("bestof/bestof_2025-03-02.mp4"));

        assert_eq!(record.clips_count, 2);
        assert_eq!(record.total_views, 300);
        assert_eq!(record.file_path, "bestof/bestof_2025-03-02.mp4");
        assert_eq!(record.clips[0].timecode, "00:00");
    }

    #[test]
    fn test_description_lists_clips_in_order() {
        let clips = vec![clip("a", "alice", 1, 1, 61.0), clip("b", "bob", 1, 2, 10.0)];
        let record = build_record(&clips, 0.0, date(), Path::new("x.mp4"));
        let description = &record.youtube_description;

        assert!(description.starts_with("Voici le best of du 02/03/2025 j'espère"));
        assert!(description.contains("Les clips de la semaine :\n00:00 : alice - Clip a\n01:01 : bob - Clip b\n\n"));
        assert!(description.ends_with("à la semaine prochaine !"));
    }

    #[tokio::test]
    async fn test_write_record_overwrites_same_date() {
        let dir = TempDir::new().unwrap();
        let path = metadata_path(dir.path(), date());
        let clips = vec![clip("a", "alice", 1, 1, 10.0)];

        let first = build_record(&clips, 0.0, date(), Path::new("x.mp4"));
        write_record(&first, &path).await.unwrap();

        let second = build_record(&[], 0.0, date(), Path::new("x.mp4"));
        write_record(&second, &path).await.unwrap();

        let stored: BestOfRecord =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(stored, second);
        assert_eq!(stored.clips_count, 0);
    }
}
