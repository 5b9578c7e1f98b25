//! Streamer monitor and weekly best-of generator.
//!
//! This crate provides:
//! - The tracked streamer set fed by live-stream monitoring
//! - Clip selection, download and metadata writing
//! - The generation run tying them to the timeline assembler
//! - Weekly scheduling and shutdown handling

pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod generator;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod monitor;
pub mod scheduler;
pub mod selector;
pub mod tracker;

pub use config::{BestOfConfig, TimelineConfig};
pub use controller::RunController;
pub use error::{WorkerError, WorkerResult};
pub use fetcher::{ClipFetcher, FetchedClip};
pub use generator::{BestOfGenerator, RunOutcome};
pub use logging::{init_tracing, RunLogger};
pub use monitor::StreamerMonitor;
pub use scheduler::{run_weekly, WeeklySchedule};
pub use selector::{select_clips, DuplicatePolicy};
pub use tracker::StreamerTracker;
