//! Repository trait for the video catalog.

use async_trait::async_trait;
use vstream_models::{Genre, GenreId, NewVideoFile, Resolution, Video, VideoFile, VideoFileId, VideoId};

use crate::error::DbResult;

/// Result of an insert guarded by the `(video_id, resolution)` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written.
    Created(VideoFile),
    /// A row for the same video and resolution already exists; nothing changed.
    AlreadyExists,
}

/// Insert payload for a video row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub genre_id: GenreId,
    pub duration: Option<u32>,
    pub release_year: Option<u32>,
    pub is_featured: bool,
}

impl NewVideo {
    pub fn new(title: impl Into<String>, genre_id: GenreId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            genre_id,
            duration: None,
            release_year: None,
            is_featured: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Persistence operations used by the transcoding worker.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create_genre(&self, name: &str, slug: &str) -> DbResult<Genre>;

    async fn create_video(&self, video: &NewVideo) -> DbResult<Video>;

    async fn get_video(&self, id: VideoId) -> DbResult<Option<Video>>;

    /// Persist the thumbnail and preview fields of `video` in one write.
    async fn save_video_stills(&self, video: &Video) -> DbResult<()>;

    async fn get_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>>;

    async fn list_video_files(&self, video_id: VideoId) -> DbResult<Vec<VideoFile>>;

    async fn rendition_exists(&self, video_id: VideoId, resolution: Resolution) -> DbResult<bool>;

    /// Insert a file row unless one already exists for the same video and
    /// resolution. The check and the write are a single statement.
    async fn insert_video_file(&self, file: &NewVideoFile) -> DbResult<InsertOutcome>;

    /// Delete a file row, returning it if it existed.
    async fn delete_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>>;
}
