//! Video file lifecycle hooks.
//!
//! The upload path creates `original` rows and the catalog deletes rows;
//! these hooks turn those writes into a transcode job and a file removal.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};
use vstream_db::{InsertOutcome, VideoRepository};
use vstream_media::{file_size, remove_file_if_present};
use vstream_models::{NewVideoFile, VideoFile, VideoFileId};
use vstream_queue::{JobSubmitter, TranscodeVideoJob};

use crate::error::WorkerResult;

pub struct VideoFileEvents {
    repo: Arc<dyn VideoRepository>,
    submitter: Arc<dyn JobSubmitter>,
    media_root: PathBuf,
}

impl VideoFileEvents {
    pub fn new(
        repo: Arc<dyn VideoRepository>,
        submitter: Arc<dyn JobSubmitter>,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            submitter,
            media_root: media_root.into(),
        }
    }

    /// Insert a file row, filling in its size from disk when not given,
    /// then run [`Self::on_created`] for a new row.
    pub async fn create_video_file(&self, mut new_file: NewVideoFile) -> WorkerResult<InsertOutcome> {
        if new_file.file_size.is_none() && !new_file.file.trim().is_empty() {
            if let Some(bytes) = file_size(self.media_root.join(&new_file.file)).await? {
                new_file = new_file.with_size(bytes);
            }
        }

        let outcome = self.repo.insert_video_file(&new_file).await?;
        if let InsertOutcome::Created(file) = &outcome {
            self.on_created(file).await?;
        }
        Ok(outcome)
    }

    /// Enqueue a transcode job for a freshly created original.
    ///
    /// Returns the queue message ID, or `None` when the row is not an
    /// uploaded original or a job for it is already queued.
    pub async fn on_created(&self, file: &VideoFile) -> WorkerResult<Option<String>> {
        if !file.is_original() || !file.has_file() {
            debug!(file_id = %file.id, resolution = %file.resolution, "No transcode needed");
            return Ok(None);
        }

        let job = TranscodeVideoJob::new(file.id);
        match self.submitter.submit_transcode(job).await {
            Ok(message_id) => {
                info!(file_id = %file.id, "Queued transcode for VideoFile {}", file.id);
                Ok(Some(message_id))
            }
            Err(e) if e.is_duplicate() => {
                info!(file_id = %file.id, "Transcode for VideoFile {} already queued", file.id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file row and its physical file.
    pub async fn delete_video_file(&self, id: VideoFileId) -> WorkerResult<Option<VideoFile>> {
        let deleted = self.repo.delete_video_file(id).await?;
        if let Some(file) = &deleted {
            self.on_deleted(file).await?;
        }
        Ok(deleted)
    }

    /// Remove the file a deleted row pointed at. A missing file is fine.
    pub async fn on_deleted(&self, file: &VideoFile) -> WorkerResult<bool> {
        if !file.has_file() {
            return Ok(false);
        }

        let path = file.absolute_path(&self.media_root);
        let removed = remove_file_if_present(&path).await?;
        if removed {
            info!(file_id = %file.id, "Removed {}", path.display());
        } else {
            warn!(file_id = %file.id, "File {} was already gone", path.display());
        }
        Ok(removed)
    }
}
