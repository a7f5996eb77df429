//! Test doubles and fixtures shared by the worker's unit tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use vstream_db::{InsertOutcome, NewVideo, SqliteVideoRepository, VideoRepository};
use vstream_media::{Encoder, FfmpegCommand, MediaError, MediaResult};
use vstream_models::{
    NewVideoFile, Resolution, StillKind, Video, VideoFile, VideoFileId,
};

use crate::logging::TranscodeObserver;
use crate::orchestrator::TranscodeReport;

/// Encoder double. Writes whatever output it is asked for (playlist plus one
/// segment for HLS runs) unless the output path matches a configured marker.
#[derive(Default)]
pub(crate) struct FakeEncoder {
    fail_on: Vec<&'static str>,
    silent_on: Vec<&'static str>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit non-zero when the output path contains `marker`.
    pub fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_on.push(marker);
        self
    }

    /// Report success without writing anything when the output path
    /// contains `marker`.
    pub fn silent_on(mut self, marker: &'static str) -> Self {
        self.silent_on.push(marker);
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_matching(&self, marker: &str) -> usize {
        self.calls()
            .iter()
            .filter(|p| p.to_string_lossy().contains(marker))
            .count()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let output = cmd.output().to_path_buf();
        self.calls.lock().unwrap().push(output.clone());

        let path = output.to_string_lossy().into_owned();
        if self.fail_on.iter().any(|m| path.contains(m)) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with code 1",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        if self.silent_on.iter().any(|m| path.contains(m)) {
            return Ok(());
        }

        if let Some(dir) = output.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        if path.ends_with(".m3u8") {
            tokio::fs::write(&output, b"#EXTM3U\n#EXT-X-ENDLIST\n").await?;
            if let Some(dir) = output.parent() {
                tokio::fs::write(dir.join("segment_000.ts"), vec![0u8; 256]).await?;
            }
        } else {
            tokio::fs::write(&output, b"\xFF\xD8\xFF").await?;
        }
        Ok(())
    }
}

/// Observer double that records every event as a short string.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl TranscodeObserver for RecordingObserver {
    fn job_started(&self, video: &Video, _original: &VideoFile) {
        self.push(format!("started:{}", video.id));
    }

    fn original_missing(&self, original_file_id: VideoFileId) {
        self.push(format!("missing:{}", original_file_id));
    }

    fn still_skipped(&self, kind: StillKind) {
        self.push(format!("still_skipped:{}", kind));
    }

    fn still_generated(&self, kind: StillKind, relative_path: &str) {
        self.push(format!("still_generated:{}:{}", kind, relative_path));
    }

    fn still_failed(&self, kind: StillKind, reason: &str) {
        self.push(format!("still_failed:{}:{}", kind, reason));
    }

    fn stills_not_saved(&self, reason: &str) {
        self.push(format!("stills_not_saved:{}", reason));
    }

    fn rendition_skipped(&self, resolution: Resolution) {
        self.push(format!("skipped:{}", resolution));
    }

    fn rendition_converted(&self, file: &VideoFile) {
        self.push(format!("converted:{}", file.resolution));
    }

    fn rendition_failed(&self, resolution: Resolution, reason: &str) {
        self.push(format!("failed:{}:{}", resolution, reason));
    }

    fn job_finished(&self, report: &TranscodeReport) {
        self.push(format!("finished:{}", report.video_id));
    }
}

/// A media root holding `videos/movie.mp4`, an in-memory store with one
/// video, and that video's original file row.
pub(crate) struct Fixture {
    pub media: TempDir,
    pub repo: Arc<SqliteVideoRepository>,
    pub video: Video,
    pub original: VideoFile,
}

impl Fixture {
    pub async fn new() -> Self {
        let media = TempDir::new().unwrap();
        let source = media.path().join("videos").join("movie.mp4");
        tokio::fs::create_dir_all(source.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&source, vec![1u8; 1024]).await.unwrap();

        let repo = Arc::new(SqliteVideoRepository::in_memory().await.unwrap());
        let genre = repo.create_genre("Drama", "drama").await.unwrap();
        let video = repo
            .create_video(&NewVideo::new("Movie", genre.id))
            .await
            .unwrap();

        let original = match repo
            .insert_video_file(
                &NewVideoFile::new(video.id, Resolution::Original, "videos/movie.mp4")
                    .with_size(1024),
            )
            .await
            .unwrap()
        {
            InsertOutcome::Created(f) => f,
            InsertOutcome::AlreadyExists => unreachable!("fresh store"),
        };

        Self {
            media,
            repo,
            video,
            original,
        }
    }

    pub fn media_root(&self) -> PathBuf {
        self.media.path().to_path_buf()
    }

    pub fn source_path(&self) -> PathBuf {
        self.original.absolute_path(self.media.path())
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.media.path().join(relative)
    }

    pub async fn exists(&self, relative: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(self.media.path().join(relative))
            .await
            .unwrap()
    }
}
