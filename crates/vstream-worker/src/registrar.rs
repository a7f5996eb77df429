//! Idempotent persistence of finished renditions.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};
use vstream_db::{DbResult, InsertOutcome, VideoRepository};
use vstream_media::{directory_size, media_relative_path, HlsOutputPaths};
use vstream_models::{NewVideoFile, RenditionSpec, Resolution, VideoFile, VideoId};

/// What happened to one ladder entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionOutcome {
    /// A row for this resolution already existed.
    Skipped,
    /// Encoded and registered.
    Converted(VideoFile),
    /// Abandoned; the reason has been reported.
    Failed(String),
}

impl RenditionOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenditionOutcome::Skipped => "skipped",
            RenditionOutcome::Converted(_) => "converted",
            RenditionOutcome::Failed(_) => "failed",
        }
    }
}

/// Creates the `VideoFile` row for a rendition once its playlist is on disk.
#[derive(Clone)]
pub struct RenditionRegistrar {
    repo: Arc<dyn VideoRepository>,
    media_root: PathBuf,
}

impl RenditionRegistrar {
    pub fn new(repo: Arc<dyn VideoRepository>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            media_root: media_root.into(),
        }
    }

    /// Fast-path existence check, run before any encoding work.
    pub async fn already_registered(
        &self,
        video_id: VideoId,
        resolution: Resolution,
    ) -> DbResult<bool> {
        self.repo.rendition_exists(video_id, resolution).await
    }

    /// Register a rendition whose encoder run reported success.
    ///
    /// Never returns an error: persistence and filesystem problems come back
    /// as [`RenditionOutcome::Failed`] so sibling renditions still run. A
    /// uniqueness conflict on insert is a skip.
    pub async fn register(
        &self,
        video_id: VideoId,
        spec: &RenditionSpec,
        paths: &HlsOutputPaths,
    ) -> RenditionOutcome {
        let resolution = spec.resolution;

        match self.already_registered(video_id, resolution).await {
            Ok(true) => return RenditionOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return RenditionOutcome::failed(format!("existence check failed: {}", e)),
        }

        match tokio::fs::try_exists(&paths.playlist).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    resolution = %resolution,
                    playlist = %paths.playlist.display(),
                    "Encoder reported success but playlist is missing"
                );
                return RenditionOutcome::failed(format!(
                    "HLS playlist not found: {}",
                    paths.playlist.display()
                ));
            }
            Err(e) => {
                return RenditionOutcome::failed(format!(
                    "cannot stat playlist {}: {}",
                    paths.playlist.display(),
                    e
                ))
            }
        }

        let total_size = match directory_size(&paths.dir).await {
            Ok(bytes) => bytes,
            Err(e) => return RenditionOutcome::failed(format!("cannot size output: {}", e)),
        };

        let relative = match media_relative_path(&paths.playlist, &self.media_root) {
            Ok(p) => p,
            Err(e) => return RenditionOutcome::failed(e.to_string()),
        };

        let new_file = NewVideoFile::new(video_id, resolution, relative)
            .with_size(total_size)
            .with_dimensions(None, Some(spec.height))
            .with_bitrate(spec.video_bitrate_kbps())
            .processed();

        match self.repo.insert_video_file(&new_file).await {
            Ok(InsertOutcome::Created(file)) => {
                debug!(resolution = %resolution, file = %file.file, "Registered rendition");
                RenditionOutcome::Converted(file)
            }
            Ok(InsertOutcome::AlreadyExists) => RenditionOutcome::Skipped,
            Err(e) => RenditionOutcome::failed(format!("error saving VideoFile: {}", e)),
        }
    }
}
