//! Shared data models for the best-of clip compiler.
//!
//! This crate provides Serde-serializable types for:
//! - Platform clips and their downloaded counterparts
//! - The best-of metadata record written after each run
//! - Timecode formatting for the assembled video
//! - Encoding and output profile configuration

pub mod bestof;
pub mod clip;
pub mod encoding;
pub mod timecode;

// Re-export common types
pub use bestof::{BestOfRecord, ClipEntry};
pub use clip::{Clip, DownloadedClip};
pub use encoding::{EncodingConfig, OutputProfile};
pub use timecode::{cumulative_offsets, format_timecode};
