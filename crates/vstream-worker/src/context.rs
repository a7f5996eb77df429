//! Shared collaborators for job processing.

use std::sync::Arc;

use tracing::info;
use vstream_db::{SqliteVideoRepository, VideoRepository};
use vstream_media::{check_ffmpeg, Encoder, FfmpegRunner};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::TranscodeObserver;
use crate::orchestrator::TranscodeOrchestrator;

/// Store, encoder and settings shared by every job a worker runs.
#[derive(Clone)]
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub repo: Arc<dyn VideoRepository>,
    pub encoder: Arc<dyn Encoder>,
}

impl ProcessingContext {
    /// Connect to the store and resolve the encoder binary.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let ffmpeg = check_ffmpeg(&config.ffmpeg_bin)?;
        info!("Using ffmpeg at {}", ffmpeg.display());

        let repo = SqliteVideoRepository::connect(&config.database_url).await?;
        let encoder = FfmpegRunner::new()
            .with_binary(ffmpeg)
            .with_timeout(config.encoder_timeout);

        Ok(Self::from_parts(config, Arc::new(repo), Arc::new(encoder)))
    }

    pub fn from_parts(
        config: WorkerConfig,
        repo: Arc<dyn VideoRepository>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            config,
            repo,
            encoder,
        }
    }

    /// Orchestrator for one job, reporting to `observer`.
    pub fn orchestrator(&self, observer: Arc<dyn TranscodeObserver>) -> TranscodeOrchestrator {
        TranscodeOrchestrator::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.encoder),
            observer,
            self.config.media_root.clone(),
        )
        .with_ladder(self.config.ladder.clone())
        .with_encoding(self.config.encoding.clone())
    }
}
