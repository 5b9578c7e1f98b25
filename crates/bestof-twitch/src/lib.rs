//! Twitch Helix client for the best-of pipeline.
//!
//! The pipeline only depends on the [`ClipSource`] trait; [`HelixClient`] is
//! the production implementation (app access token, paginated requests paced
//! with `governor`, retries on transient failures).

pub mod client;
pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use client::HelixClient;
pub use config::TwitchConfig;
pub use error::{TwitchError, TwitchResult};
pub use source::{
    sanitize_broadcaster_name, ClipQuery, ClipScope, ClipSource, LiveStream, StreamQuery,
    TimeWindow, MAX_PAGE_SIZE,
};
