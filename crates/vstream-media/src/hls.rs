//! HLS rendition planning and command construction.
//!
//! Renditions of `<root>/videos/<name>.<ext>` are written to
//! `<root>/hls/<resolution>/<name>/` as `playlist.m3u8` plus numbered
//! `segment_NNN.ts` files.

use std::path::{Path, PathBuf};

use vstream_models::encoding::{
    HLS_DIR, HLS_FLAGS, HLS_LIST_SIZE, HLS_PLAYLIST_FILENAME, HLS_SEGMENT_PATTERN,
};
use vstream_models::{EncodingConfig, RenditionSpec, Resolution};

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::fs_utils::ensure_dir;

/// Output locations for one rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutputPaths {
    /// Rendition directory
    pub dir: PathBuf,
    /// Playlist file inside `dir`
    pub playlist: PathBuf,
    /// Segment filename pattern inside `dir`
    pub segment_pattern: PathBuf,
}

/// Compute the output paths for `resolution` without touching the filesystem.
pub fn plan_hls_output(source: &Path, resolution: Resolution, base_name: &str) -> HlsOutputPaths {
    // Two levels up from the source file: <root>/videos/x.mp4 -> <root>
    let root = source
        .parent()
        .map(|parent| parent.parent().unwrap_or(parent))
        .unwrap_or_else(|| Path::new(""));

    let dir = root.join(HLS_DIR).join(resolution.as_str()).join(base_name);
    let playlist = dir.join(HLS_PLAYLIST_FILENAME);
    let segment_pattern = dir.join(HLS_SEGMENT_PATTERN);

    HlsOutputPaths {
        dir,
        playlist,
        segment_pattern,
    }
}

/// Compute the output paths and make sure the rendition directory exists.
pub async fn prepare_hls_output(
    source: &Path,
    resolution: Resolution,
    base_name: &str,
) -> MediaResult<HlsOutputPaths> {
    let paths = plan_hls_output(source, resolution, base_name);
    ensure_dir(&paths.dir).await?;
    Ok(paths)
}

/// Build the encoder invocation for one rendition.
///
/// Scales to the target height keeping aspect ratio (even width), encodes
/// H.264/AAC at the ladder bitrates and writes a VOD playlist whose
/// segments are independently decodable.
pub fn build_hls_command(
    source: &Path,
    paths: &HlsOutputPaths,
    spec: &RenditionSpec,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(source, &paths.playlist)
        .video_filter(format!("scale=-2:{}", spec.height))
        .video_codec(&encoding.codec)
        .video_bitrate(&spec.video_bitrate)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&spec.audio_bitrate)
        .preset(&encoding.preset)
        .format("hls")
        .output_args([
            "-hls_time".to_string(),
            encoding.segment_duration.to_string(),
            "-hls_list_size".to_string(),
            HLS_LIST_SIZE.to_string(),
            "-hls_segment_filename".to_string(),
            paths.segment_pattern.to_string_lossy().to_string(),
            "-hls_flags".to_string(),
            HLS_FLAGS.to_string(),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vstream_models::ResolutionLadder;

    #[test]
    fn test_plan_layout() {
        let paths = plan_hls_output(
            Path::new("/app/media/videos/movie.mp4"),
            Resolution::P1080,
            "movie",
        );
        assert_eq!(paths.dir, PathBuf::from("/app/media/hls/1080p/movie"));
        assert_eq!(
            paths.playlist,
            PathBuf::from("/app/media/hls/1080p/movie/playlist.m3u8")
        );
        assert_eq!(
            paths.segment_pattern,
            PathBuf::from("/app/media/hls/1080p/movie/segment_%03d.ts")
        );
    }

    #[test]
    fn test_hls_command_contract() {
        let source = Path::new("/app/media/videos/movie.mp4");
        let paths = plan_hls_output(source, Resolution::P720, "movie");
        let spec = RenditionSpec::new(Resolution::P720, 720, "2500k", "128k");
        let args = build_hls_command(source, &paths, &spec, &EncodingConfig::default()).build_args();

        assert_eq!(
            args,
            vec![
                "-i",
                "/app/media/videos/movie.mp4",
                "-vf",
                "scale=-2:720",
                "-c:v",
                "libx264",
                "-b:v",
                "2500k",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-preset",
                "fast",
                "-f",
                "hls",
                "-hls_time",
                "6",
                "-hls_list_size",
                "0",
                "-hls_segment_filename",
                "/app/media/hls/720p/movie/segment_%03d.ts",
                "-hls_flags",
                "independent_segments",
                "-y",
                "/app/media/hls/720p/movie/playlist.m3u8",
            ]
        );
    }

    #[test]
    fn test_every_ladder_entry_uses_its_height_and_bitrates() {
        let source = Path::new("/media/videos/clip.mov");
        let encoding = EncodingConfig::default().with_preset("veryfast");

        for spec in &ResolutionLadder::default() {
            let paths = plan_hls_output(source, spec.resolution, "clip");
            let args = build_hls_command(source, &paths, spec, &encoding).build_args();

            assert!(args.contains(&format!("scale=-2:{}", spec.height)));
            let vb = args.iter().position(|a| a == "-b:v").unwrap();
            assert_eq!(args[vb + 1], spec.video_bitrate);
            let ab = args.iter().position(|a| a == "-b:a").unwrap();
            assert_eq!(args[ab + 1], spec.audio_bitrate);
            let preset = args.iter().position(|a| a == "-preset").unwrap();
            assert_eq!(args[preset + 1], "veryfast");
        }
    }

    #[tokio::test]
    async fn test_prepare_creates_directory() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("videos").join("movie.mp4");

        let paths = prepare_hls_output(&source, Resolution::P360, "movie").await.unwrap();
        assert!(paths.dir.is_dir());
        assert_eq!(paths.dir, root.path().join("hls/360p/movie"));

        // Second call against the existing directory is fine.
        prepare_hls_output(&source, Resolution::P360, "movie").await.unwrap();
    }
}
