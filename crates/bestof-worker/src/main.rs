//! Best-of worker binary.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use bestof_media::{check_ffmpeg, check_ffprobe, check_ytdlp, MediaResult, YtDlpDownloader};
use bestof_twitch::HelixClient;
use bestof_worker::{
    init_tracing, run_weekly, BestOfConfig, BestOfGenerator, RunController, RunOutcome,
    StreamerMonitor,
};

#[derive(Debug, Parser)]
#[command(name = "bestof-worker", version, about = "Weekly Twitch clip best-of generator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Monitor live streams and generate the best-of every week (default)
    Run,
    /// Generate a best-of now and exit
    Bestof {
        /// Clips in the best-of
        #[arg(long, env = "BESTOF_TOTAL_CLIPS")]
        clips: Option<usize>,
        /// Clips fetched per streamer
        #[arg(long, env = "BESTOF_MAX_CLIPS_PER_STREAMER")]
        streamer_clips: Option<usize>,
    },
    /// Only monitor live streams
    Monitor,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    info!("Starting bestof-worker");

    let mut config = BestOfConfig::from_env();
    if let Some(Command::Bestof {
        clips,
        streamer_clips,
    }) = &cli.command
    {
        if let Some(clips) = clips {
            config.total_bestof_clips = *clips;
        }
        if let Some(streamer_clips) = streamer_clips {
            config.max_clips_per_streamer = *streamer_clips;
        }
    }
    info!("Worker config: {:?}", config);

    let source = match HelixClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create Twitch client: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command.unwrap_or(Command::Run) {
        Command::Monitor => {
            let controller = RunController::new();
            controller.shutdown_on_ctrl_c();
            StreamerMonitor::new(source, &config)
                .run(controller.token())
                .await;
            0
        }
        Command::Bestof { .. } => {
            if !tools_available() {
                std::process::exit(1);
            }
            let controller = RunController::new();
            controller.shutdown_on_ctrl_c();
            let cancel = controller.token();

            let generator = generator(source, config);
            tokio::select! {
                outcome = generator.run(Local::now().date_naive()) => report(&outcome),
                _ = cancel.cancelled() => {
                    warn!("Best-of generation interrupted");
                    130
                }
            }
        }
        Command::Run => {
            if !tools_available() {
                std::process::exit(1);
            }
            run_forever(source, config).await;
            0
        }
    };

    info!("Worker shutdown complete");
    std::process::exit(code);
}

fn generator(source: Arc<HelixClient>, config: BestOfConfig) -> BestOfGenerator {
    let assembler = Arc::new(config.timeline.assembler());
    BestOfGenerator::new(source, Arc::new(YtDlpDownloader::new()), assembler, config)
}

/// Monitor continuously and generate on schedule until Ctrl+C.
async fn run_forever(source: Arc<HelixClient>, config: BestOfConfig) {
    let controller = RunController::new();
    controller.shutdown_on_ctrl_c();

    let schedule = config.schedule;
    let monitor = StreamerMonitor::new(source.clone(), &config);
    let generator = generator(source, config);

    info!(
        "Best-of scheduled every {} at {}",
        schedule.weekday, schedule.time
    );

    let generator = &generator;
    tokio::join!(
        monitor.run(controller.child_token()),
        run_weekly(schedule, controller.child_token(), move || async move {
            let outcome = generator.run(Local::now().date_naive()).await;
            report(&outcome);
        }),
    );
}

fn tools_available() -> bool {
    let mut ok = true;
    for (name, check) in [
        ("ffmpeg", check_ffmpeg as fn() -> MediaResult<PathBuf>),
        ("ffprobe", check_ffprobe),
        ("yt-dlp", check_ytdlp),
    ] {
        match check() {
            Ok(path) => info!("Using {} at {}", name, path.display()),
            Err(e) => {
                error!("{}", e);
                ok = false;
            }
        }
    }
    ok
}

/// Log the outcome and map it to an exit code.
fn report(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed {
            record,
            video_path,
            metadata_path,
        } => {
            info!("Best-of ready: {}", video_path.display());
            info!("Title: {}", record.youtube_title);
            match metadata_path {
                Some(path) => info!("Metadata: {}", path.display()),
                None => warn!("Metadata was not saved"),
            }
            0
        }
        RunOutcome::AssemblyFailed { reason } => {
            error!("Best-of generation failed: {}", reason);
            1
        }
        other => {
            warn!("No best-of generated ({})", other.label());
            0
        }
    }
}
