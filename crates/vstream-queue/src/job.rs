//! Job types for the queue.

use serde::{Deserialize, Serialize};
use vstream_models::VideoFileId;

/// Job to transcode an uploaded original into the HLS ladder and extract
/// its stills.
///
/// The payload is only the `original` row's ID. Everything else is loaded
/// from the store when the job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeVideoJob {
    /// The `original` video file row to transcode
    pub original_file_id: VideoFileId,
}

impl TranscodeVideoJob {
    pub fn new(original_file_id: VideoFileId) -> Self {
        Self { original_file_id }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("transcode:{}", self.original_file_id)
    }
}

/// Envelope stored in the stream. The `type` tag is the only field added
/// to the job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    TranscodeVideo(TranscodeVideoJob),
}

impl QueueJob {
    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::TranscodeVideo(j) => j.idempotency_key(),
        }
    }

    pub fn job_type(&self) -> &'static str {
        match self {
            QueueJob::TranscodeVideo(_) => "transcode_video",
        }
    }
}
