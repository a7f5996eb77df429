//! Transcode job entry point.
//!
//! One run takes an `original` video file through still extraction and then
//! every ladder entry in order. Each rendition is planned, encoded and
//! registered on its own; a skip or failure ends that rendition only.
//! The only job-level failures are a missing or unusable original and an
//! unreachable store while loading it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vstream_db::VideoRepository;
use vstream_media::{build_hls_command, prepare_hls_output, run_conversion, Encoder};
use vstream_models::{
    EncodingConfig, RenditionSpec, Resolution, ResolutionLadder, Video, VideoFileId, VideoId,
};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::TranscodeObserver;
use crate::metrics::record_rendition;
use crate::registrar::{RenditionOutcome, RenditionRegistrar};
use crate::stills::StillExtractor;

/// Per-job summary, in ladder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeReport {
    pub video_id: VideoId,
    /// Still image fields set by this run
    pub stills_updated: usize,
    pub renditions: Vec<(Resolution, RenditionOutcome)>,
}

impl TranscodeReport {
    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, RenditionOutcome::Converted(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RenditionOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RenditionOutcome::Failed(_)))
    }

    pub fn outcome(&self, resolution: Resolution) -> Option<&RenditionOutcome> {
        self.renditions
            .iter()
            .find(|(r, _)| *r == resolution)
            .map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&RenditionOutcome) -> bool) -> usize {
        self.renditions.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Drives one transcode job. Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct TranscodeOrchestrator {
    repo: Arc<dyn VideoRepository>,
    encoder: Arc<dyn Encoder>,
    observer: Arc<dyn TranscodeObserver>,
    ladder: ResolutionLadder,
    encoding: EncodingConfig,
    media_root: PathBuf,
    registrar: RenditionRegistrar,
    stills: StillExtractor,
}

impl TranscodeOrchestrator {
    pub fn new(
        repo: Arc<dyn VideoRepository>,
        encoder: Arc<dyn Encoder>,
        observer: Arc<dyn TranscodeObserver>,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        let media_root = media_root.into();
        Self {
            registrar: RenditionRegistrar::new(Arc::clone(&repo), media_root.clone()),
            stills: StillExtractor::new(Arc::clone(&encoder), media_root.clone()),
            repo,
            encoder,
            observer,
            ladder: ResolutionLadder::default(),
            encoding: EncodingConfig::default(),
            media_root,
        }
    }

    pub fn with_ladder(mut self, ladder: ResolutionLadder) -> Self {
        self.ladder = ladder;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Transcode the original file `original_file_id`.
    pub async fn run(&self, original_file_id: VideoFileId) -> WorkerResult<TranscodeReport> {
        let Some(original) = self.repo.get_video_file(original_file_id).await? else {
            self.observer.original_missing(original_file_id);
            return Err(WorkerError::OriginalNotFound(original_file_id));
        };

        if !original.is_original() {
            return Err(WorkerError::invalid_original(format!(
                "VideoFile {} has resolution {}",
                original.id, original.resolution
            )));
        }
        let base_name = original
            .base_name()
            .filter(|b| original.has_file() && !b.is_empty())
            .ok_or_else(|| {
                WorkerError::invalid_original(format!("VideoFile {} has no file", original.id))
            })?;

        let mut video = self
            .repo
            .get_video(original.video_id)
            .await?
            .ok_or(WorkerError::VideoNotFound(original.video_id))?;

        let source = original.absolute_path(&self.media_root);
        self.observer.job_started(&video, &original);

        let mut stills_updated = 0;
        if video.needs_stills() {
            stills_updated = self
                .stills
                .extract(&mut video, &source, &base_name, self.observer.as_ref())
                .await;
            if stills_updated > 0 {
                if let Err(e) = self.repo.save_video_stills(&video).await {
                    self.observer.stills_not_saved(&e.to_string());
                }
            }
        }

        let mut renditions = Vec::with_capacity(self.ladder.len());
        for spec in &self.ladder {
            let outcome = self.transcode_rendition(&video, &source, &base_name, spec).await;

            match &outcome {
                RenditionOutcome::Skipped => self.observer.rendition_skipped(spec.resolution),
                RenditionOutcome::Converted(file) => self.observer.rendition_converted(file),
                RenditionOutcome::Failed(reason) => {
                    self.observer.rendition_failed(spec.resolution, reason)
                }
            }
            record_rendition(spec.resolution.as_str(), outcome.as_str());
            renditions.push((spec.resolution, outcome));
        }

        let report = TranscodeReport {
            video_id: video.id,
            stills_updated,
            renditions,
        };
        self.observer.job_finished(&report);
        Ok(report)
    }

    async fn transcode_rendition(
        &self,
        video: &Video,
        source: &Path,
        base_name: &str,
        spec: &RenditionSpec,
    ) -> RenditionOutcome {
        match self.registrar.already_registered(video.id, spec.resolution).await {
            Ok(true) => return RenditionOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return RenditionOutcome::failed(format!("existence check failed: {}", e)),
        }

        let paths = match prepare_hls_output(source, spec.resolution, base_name).await {
            Ok(paths) => paths,
            Err(e) => {
                return RenditionOutcome::failed(format!("cannot create output directory: {}", e))
            }
        };

        let cmd = build_hls_command(source, &paths, spec, &self.encoding);
        let converted = run_conversion(
            self.encoder.as_ref(),
            &cmd,
            spec.resolution.as_str(),
            &video.title,
        )
        .await;
        if !converted {
            return RenditionOutcome::failed("encoder failed");
        }

        self.registrar.register(video.id, spec, &paths).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vstream_db::{DbError, DbResult, InsertOutcome, NewVideo};
    use vstream_models::{Genre, NewVideoFile, RenditionSpec, VideoFile};

    use crate::test_support::{FakeEncoder, Fixture, RecordingObserver};

    fn orchestrator(
        fx: &Fixture,
        repo: Arc<dyn VideoRepository>,
        encoder: Arc<FakeEncoder>,
        observer: Arc<RecordingObserver>,
    ) -> TranscodeOrchestrator {
        TranscodeOrchestrator::new(repo, encoder, observer, fx.media_root())
    }

    fn ladder_1080() -> ResolutionLadder {
        ResolutionLadder::new(vec![RenditionSpec::new(
            Resolution::P1080,
            1080,
            "5000k",
            "192k",
        )])
    }

    #[tokio::test]
    async fn test_single_rendition_scenario() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new());
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone())
            .with_ladder(ladder_1080());

        let report = orch.run(fx.original.id).await.unwrap();
        assert_eq!(report.converted(), 1);

        let files = fx.repo.list_video_files(fx.video.id).await.unwrap();
        let renditions: Vec<&VideoFile> = files.iter().filter(|f| !f.is_original()).collect();
        assert_eq!(renditions.len(), 1);
        assert_eq!(renditions[0].resolution, Resolution::P1080);
        assert!(renditions[0].is_processed);
        assert!(renditions[0].file.ends_with("hls/1080p/movie/playlist.m3u8"));
        assert!(fx.exists("hls/1080p/movie/segment_000.ts").await);

        // Stills were persisted once, before the ladder.
        let video = fx.repo.get_video(fx.video.id).await.unwrap().unwrap();
        assert_eq!(video.thumbnail.as_deref(), Some("thumbnails/movie_thumb.jpg"));
        assert_eq!(video.preview_image.as_deref(), Some("previews/movie_preview.jpg"));
        assert_eq!(encoder.call_count(), 3);
    }

    #[tokio::test]
    async fn test_existing_rendition_is_not_encoded() {
        let fx = Fixture::new().await;
        fx.repo
            .insert_video_file(
                &NewVideoFile::new(fx.video.id, Resolution::P1080, "hls/1080p/movie/playlist.m3u8")
                    .processed(),
            )
            .await
            .unwrap();

        let encoder = Arc::new(FakeEncoder::new());
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone())
            .with_ladder(ladder_1080());

        let report = orch.run(fx.original.id).await.unwrap();

        assert_eq!(report.outcome(Resolution::P1080), Some(&RenditionOutcome::Skipped));
        assert_eq!(encoder.calls_matching("/hls/"), 0);
        assert_eq!(fx.repo.list_video_files(fx.video.id).await.unwrap().len(), 2);
        assert_eq!(observer.count("skipped:1080p"), 1);
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new());
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone());

        let first = orch.run(fx.original.id).await.unwrap();
        assert_eq!(first.converted(), 4);
        let calls_after_first = encoder.call_count();
        assert_eq!(calls_after_first, 2 + 4);

        let second = orch.run(fx.original.id).await.unwrap();
        assert_eq!(second.skipped(), 4);
        assert_eq!(second.stills_updated, 0);
        assert_eq!(encoder.call_count(), calls_after_first);

        let files = fx.repo.list_video_files(fx.video.id).await.unwrap();
        assert_eq!(files.len(), 5);
        assert_eq!(
            VideoFile::available_resolutions(&files).len(),
            Resolution::ALL.len()
        );
    }

    #[tokio::test]
    async fn test_missing_original_touches_nothing() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new());
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone());

        let err = orch.run(VideoFileId(9999)).await.unwrap_err();

        assert!(matches!(err, WorkerError::OriginalNotFound(VideoFileId(9999))));
        assert!(err.is_permanent_failure());
        assert_eq!(encoder.call_count(), 0);
        assert!(!fx.exists("hls").await);
        assert!(!fx.exists("thumbnails").await);
        assert!(!fx.exists("previews").await);
        assert_eq!(fx.repo.list_video_files(fx.video.id).await.unwrap().len(), 1);
        assert_eq!(observer.events(), vec!["missing:9999".to_string()]);
    }

    #[tokio::test]
    async fn test_rendition_id_is_rejected() {
        let fx = Fixture::new().await;
        let created = fx
            .repo
            .insert_video_file(&NewVideoFile::new(fx.video.id, Resolution::P720, "hls/720p/movie/playlist.m3u8"))
            .await
            .unwrap();
        let InsertOutcome::Created(rendition) = created else {
            panic!("expected a new row");
        };

        let encoder = Arc::new(FakeEncoder::new());
        let orch = orchestrator(
            &fx,
            fx.repo.clone(),
            encoder.clone(),
            Arc::new(RecordingObserver::default()),
        );

        let err = orch.run(rendition.id).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidOriginal(_)));
        assert_eq!(encoder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_encoder_failure_continues_ladder() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new().failing_on("/720p/"));
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone());

        let report = orch.run(fx.original.id).await.unwrap();

        assert_eq!(report.converted(), 3);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcome(Resolution::P720),
            Some(RenditionOutcome::Failed(_))
        ));
        assert!(!fx.repo.rendition_exists(fx.video.id, Resolution::P720).await.unwrap());
        for later in [Resolution::P360, Resolution::P120] {
            assert!(fx.repo.rendition_exists(fx.video.id, later).await.unwrap());
        }

        let order: Vec<_> = report.renditions.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            order,
            vec![Resolution::P1080, Resolution::P720, Resolution::P360, Resolution::P120]
        );
    }

    #[tokio::test]
    async fn test_missing_playlist_is_a_rendition_failure() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new().silent_on("/360p/"));
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone());

        let report = orch.run(fx.original.id).await.unwrap();

        assert!(matches!(
            report.outcome(Resolution::P360),
            Some(RenditionOutcome::Failed(reason)) if reason.contains("playlist")
        ));
        assert!(!fx.repo.rendition_exists(fx.video.id, Resolution::P360).await.unwrap());
        assert!(fx.repo.rendition_exists(fx.video.id, Resolution::P120).await.unwrap());
        assert_eq!(observer.count("failed:360p"), 1);
    }

    #[tokio::test]
    async fn test_still_failure_does_not_stop_renditions() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new()
            .failing_on("/thumbnails/")
            .failing_on("/previews/"));
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, fx.repo.clone(), encoder.clone(), observer.clone());

        let report = orch.run(fx.original.id).await.unwrap();

        assert_eq!(report.stills_updated, 0);
        assert_eq!(report.converted(), 4);
        assert_eq!(observer.count("still_failed"), 2);
        let video = fx.repo.get_video(fx.video.id).await.unwrap().unwrap();
        assert!(video.thumbnail.is_none());
    }

    /// Store whose inserts fail for one resolution.
    struct FailingInsertRepo {
        inner: Arc<dyn VideoRepository>,
        fail_for: Resolution,
    }

    #[async_trait]
    impl VideoRepository for FailingInsertRepo {
        async fn create_genre(&self, name: &str, slug: &str) -> DbResult<Genre> {
            self.inner.create_genre(name, slug).await
        }

        async fn create_video(&self, video: &NewVideo) -> DbResult<Video> {
            self.inner.create_video(video).await
        }

        async fn get_video(&self, id: VideoId) -> DbResult<Option<Video>> {
            self.inner.get_video(id).await
        }

        async fn save_video_stills(&self, video: &Video) -> DbResult<()> {
            self.inner.save_video_stills(video).await
        }

        async fn get_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>> {
            self.inner.get_video_file(id).await
        }

        async fn list_video_files(&self, video_id: VideoId) -> DbResult<Vec<VideoFile>> {
            self.inner.list_video_files(video_id).await
        }

        async fn rendition_exists(
            &self,
            video_id: VideoId,
            resolution: Resolution,
        ) -> DbResult<bool> {
            self.inner.rendition_exists(video_id, resolution).await
        }

        async fn insert_video_file(&self, file: &NewVideoFile) -> DbResult<InsertOutcome> {
            if file.resolution == self.fail_for {
                return Err(DbError::Database(vstream_db::sqlx::Error::PoolTimedOut));
            }
            self.inner.insert_video_file(file).await
        }

        async fn delete_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>> {
            self.inner.delete_video_file(id).await
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_per_rendition() {
        let fx = Fixture::new().await;
        let repo = Arc::new(FailingInsertRepo {
            inner: fx.repo.clone(),
            fail_for: Resolution::P1080,
        });
        let encoder = Arc::new(FakeEncoder::new());
        let observer = Arc::new(RecordingObserver::default());
        let orch = orchestrator(&fx, repo, encoder.clone(), observer.clone());

        let report = orch.run(fx.original.id).await.unwrap();

        assert!(matches!(
            report.outcome(Resolution::P1080),
            Some(RenditionOutcome::Failed(reason)) if reason.contains("error saving VideoFile")
        ));
        assert_eq!(report.converted(), 3);
        assert!(!fx.repo.rendition_exists(fx.video.id, Resolution::P1080).await.unwrap());
    }
}
