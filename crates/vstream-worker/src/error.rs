//! Worker error types.

use thiserror::Error;
use vstream_db::DbError;
use vstream_models::{VideoFileId, VideoId};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Original video file not found: {0}")]
    OriginalNotFound(VideoFileId),

    #[error("Video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("Invalid original file: {0}")]
    InvalidOriginal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Media error: {0}")]
    Media(#[from] vstream_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] vstream_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_original(msg: impl Into<String>) -> Self {
        Self::InvalidOriginal(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Only infrastructure failures qualify. Rendition-level failures never
    /// reach this point; they are absorbed by the orchestrator.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Db(e) => e.is_transient(),
            WorkerError::Queue(_) | WorkerError::Io(_) => true,
            _ => false,
        }
    }

    /// Check if this is a permanent failure that should NOT be retried.
    ///
    /// The job is acknowledged and dropped: redelivering it would find the
    /// same missing or malformed record.
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::OriginalNotFound(_)
                | WorkerError::VideoNotFound(_)
                | WorkerError::InvalidOriginal(_)
                | WorkerError::ConfigError(_)
                | WorkerError::Db(DbError::Decode(_))
        )
    }
}
