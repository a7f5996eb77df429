//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job processing with
//! tracing spans and contextual information, plus the observer seam the
//! orchestrator reports progress through.

use tracing::{error, info, warn, Span};
use vstream_models::{Resolution, StillKind, Video, VideoFile, VideoFileId};

use crate::orchestrator::TranscodeReport;

/// Receives progress events from a transcode job.
pub trait TranscodeObserver: Send + Sync {
    fn job_started(&self, video: &Video, original: &VideoFile);

    fn original_missing(&self, original_file_id: VideoFileId);

    fn still_skipped(&self, kind: StillKind);

    fn still_generated(&self, kind: StillKind, relative_path: &str);

    fn still_failed(&self, kind: StillKind, reason: &str);

    fn stills_not_saved(&self, reason: &str);

    fn rendition_skipped(&self, resolution: Resolution);

    fn rendition_converted(&self, file: &VideoFile);

    fn rendition_failed(&self, resolution: Resolution, reason: &str);

    fn job_finished(&self, report: &TranscodeReport);
}

/// Job logger for structured logging with consistent formatting.
///
/// Every event carries the job's stream message ID and operation type as
/// fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job_id: &str, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}

impl TranscodeObserver for JobLogger {
    fn job_started(&self, video: &Video, original: &VideoFile) {
        self.log_start(&format!(
            "transcoding '{}' from {} (video {})",
            video.title, original.file, video.id
        ));
    }

    fn original_missing(&self, original_file_id: VideoFileId) {
        self.log_error(&format!("VideoFile with ID {} not found", original_file_id));
    }

    fn still_skipped(&self, kind: StillKind) {
        self.log_progress(&format!("{} already present, skipping", kind));
    }

    fn still_generated(&self, kind: StillKind, relative_path: &str) {
        self.log_progress(&format!("{} generated: {}", kind, relative_path));
    }

    fn still_failed(&self, kind: StillKind, reason: &str) {
        self.log_warning(&format!("Error generating {}: {}", kind, reason));
    }

    fn stills_not_saved(&self, reason: &str) {
        self.log_error(&format!("Failed to save still images: {}", reason));
    }

    fn rendition_skipped(&self, resolution: Resolution) {
        self.log_progress(&format!("{} already exists, skipping", resolution));
    }

    fn rendition_converted(&self, file: &VideoFile) {
        self.log_progress(&format!(
            "{} registered: {} ({} bytes)",
            file.resolution,
            file.file,
            file.file_size.unwrap_or(0)
        ));
    }

    fn rendition_failed(&self, resolution: Resolution, reason: &str) {
        self.log_error(&format!("{} failed: {}", resolution, reason));
    }

    fn job_finished(&self, report: &TranscodeReport) {
        self.log_completion(&format!(
            "video {}: {} converted, {} skipped, {} failed",
            report.video_id,
            report.converted(),
            report.skipped(),
            report.failed()
        ));
    }
}
