//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Twitch error: {0}")]
    Twitch(#[from] bestof_twitch::TwitchError),

    #[error("Media error: {0}")]
    Media(#[from] bestof_media::MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn persistence_failed(msg: impl Into<String>) -> Self {
        Self::PersistenceFailed(msg.into())
    }
}
