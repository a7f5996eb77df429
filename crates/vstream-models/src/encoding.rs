//! Video encoding configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";

/// HLS segment target duration in seconds
pub const HLS_SEGMENT_DURATION: u32 = 6;
/// HLS playlist size (0 keeps every segment in the playlist)
pub const HLS_LIST_SIZE: u32 = 0;
/// HLS flags applied to every rendition
pub const HLS_FLAGS: &str = "independent_segments";
/// Playlist filename inside each rendition directory
pub const HLS_PLAYLIST_FILENAME: &str = "playlist.m3u8";
/// Segment filename pattern inside each rendition directory
pub const HLS_SEGMENT_PATTERN: &str = "segment_%03d.ts";
/// Directory (under the media root) holding all HLS renditions
pub const HLS_DIR: &str = "hls";

/// Thumbnail generation settings
pub const THUMBNAIL_SCALE_WIDTH: u32 = 320;
pub const THUMBNAIL_TIMESTAMP: &str = "00:00:03";
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// Preview image generation settings
pub const PREVIEW_SCALE_WIDTH: u32 = 1280;
pub const PREVIEW_TIMESTAMP: &str = "00:00:05";
pub const PREVIEW_DIR: &str = "previews";

/// Default media root inside the container
pub const DEFAULT_MEDIA_ROOT: &str = "/app/media";

/// Kind of still image derived from a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StillKind {
    Thumbnail,
    Preview,
}

impl StillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StillKind::Thumbnail => "thumbnail",
            StillKind::Preview => "preview",
        }
    }

    /// Seek offset the frame is taken from.
    pub fn timestamp(&self) -> &'static str {
        match self {
            StillKind::Thumbnail => THUMBNAIL_TIMESTAMP,
            StillKind::Preview => PREVIEW_TIMESTAMP,
        }
    }

    /// Output width in pixels; height follows the source aspect ratio.
    pub fn scale_width(&self) -> u32 {
        match self {
            StillKind::Thumbnail => THUMBNAIL_SCALE_WIDTH,
            StillKind::Preview => PREVIEW_SCALE_WIDTH,
        }
    }

    /// Directory under the media root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            StillKind::Thumbnail => THUMBNAIL_DIR,
            StillKind::Preview => PREVIEW_DIR,
        }
    }

    /// Output filename for a source with the given base name.
    pub fn file_name(&self, base_name: &str) -> String {
        match self {
            StillKind::Thumbnail => format!("{}_thumb.jpg", base_name),
            StillKind::Preview => format!("{}_preview.jpg", base_name),
        }
    }
}

impl fmt::Display for StillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoder settings shared by every rendition of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video codec
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// HLS segment duration in seconds
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_segment_duration() -> u32 {
    HLS_SEGMENT_DURATION
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            segment_duration: HLS_SEGMENT_DURATION,
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with the given preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }
}
