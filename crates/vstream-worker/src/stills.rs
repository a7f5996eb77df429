//! Thumbnail and preview extraction for a video.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vstream_media::{generate_still, media_relative_path, Encoder, MediaError};
use vstream_models::{StillKind, Video};

use crate::logging::TranscodeObserver;
use crate::metrics::record_still;

const STILL_KINDS: [StillKind; 2] = [StillKind::Thumbnail, StillKind::Preview];

/// Fills in missing still images on a [`Video`].
#[derive(Clone)]
pub struct StillExtractor {
    encoder: Arc<dyn Encoder>,
    media_root: PathBuf,
}

impl StillExtractor {
    pub fn new(encoder: Arc<dyn Encoder>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            media_root: media_root.into(),
        }
    }

    /// Generate each still the video does not reference yet and set the
    /// corresponding field. The record is not saved here.
    ///
    /// Returns how many fields were set. Encoder failures are reported to
    /// `observer` and leave the field untouched.
    pub async fn extract(
        &self,
        video: &mut Video,
        source: &Path,
        base_name: &str,
        observer: &dyn TranscodeObserver,
    ) -> usize {
        let mut updated = 0;

        for kind in STILL_KINDS {
            if video.still(kind).is_some() {
                observer.still_skipped(kind);
                record_still(kind.as_str(), "skipped");
                continue;
            }

            let generated =
                generate_still(self.encoder.as_ref(), source, &self.media_root, kind, base_name)
                    .await
                    .and_then(|abs| media_relative_path(abs, &self.media_root));

            match generated {
                Ok(relative) => {
                    observer.still_generated(kind, &relative);
                    record_still(kind.as_str(), "generated");
                    video.set_still(kind, relative);
                    updated += 1;
                }
                Err(e) => {
                    observer.still_failed(kind, &describe(&e));
                    record_still(kind.as_str(), "failed");
                }
            }
        }

        updated
    }
}

fn describe(err: &MediaError) -> String {
    match err.stderr() {
        Some(stderr) => format!("{}: {}", err, stderr),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeEncoder, Fixture, RecordingObserver};

    #[tokio::test]
    async fn test_extracts_both_stills() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new());
        let extractor = StillExtractor::new(encoder.clone(), fx.media_root());
        let observer = RecordingObserver::default();
        let mut video = fx.video.clone();

        let updated = extractor
            .extract(&mut video, &fx.source_path(), "movie", &observer)
            .await;

        assert_eq!(updated, 2);
        assert_eq!(video.thumbnail.as_deref(), Some("thumbnails/movie_thumb.jpg"));
        assert_eq!(video.preview_image.as_deref(), Some("previews/movie_preview.jpg"));
        assert!(fx.exists("thumbnails/movie_thumb.jpg").await);
        assert!(fx.exists("previews/movie_preview.jpg").await);
        assert_eq!(encoder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_existing_stills_are_a_no_op() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new());
        let extractor = StillExtractor::new(encoder.clone(), fx.media_root());
        let observer = RecordingObserver::default();
        let mut video = fx.video.clone();
        video.set_still(StillKind::Thumbnail, "thumbnails/custom.jpg");
        video.set_still(StillKind::Preview, "previews/custom.jpg");
        let before = video.clone();

        let updated = extractor
            .extract(&mut video, &fx.source_path(), "movie", &observer)
            .await;

        assert_eq!(updated, 0);
        assert_eq!(encoder.call_count(), 0);
        assert_eq!(video, before);
        assert_eq!(observer.count("still_skipped"), 2);
    }

    #[tokio::test]
    async fn test_one_failure_keeps_the_other() {
        let fx = Fixture::new().await;
        let encoder = Arc::new(FakeEncoder::new().failing_on("_thumb"));
        let extractor = StillExtractor::new(encoder.clone(), fx.media_root());
        let observer = RecordingObserver::default();
        let mut video = fx.video.clone();

        let updated = extractor
            .extract(&mut video, &fx.source_path(), "movie", &observer)
            .await;

        assert_eq!(updated, 1);
        assert!(video.thumbnail.is_none());
        assert_eq!(video.preview_image.as_deref(), Some("previews/movie_preview.jpg"));
        let failures: Vec<_> = observer
            .events()
            .into_iter()
            .filter(|e| e.starts_with("still_failed:thumbnail"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("Conversion failed!"));
    }
}
