//! Video catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::encoding::StillKind;
use crate::resolution::Resolution;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Primary key of a video row.
    VideoId
);
row_id!(
    /// Primary key of a video file row.
    VideoFileId
);
row_id!(
    /// Primary key of a genre row.
    GenreId
);

/// Catalog genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog video. Owns a set of [`VideoFile`]s, at most one per resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub description: String,
    pub genre_id: GenreId,
    /// Duration in seconds
    pub duration: Option<u32>,
    pub release_year: Option<u32>,
    /// Thumbnail path relative to the media root
    pub thumbnail: Option<String>,
    /// Preview image path relative to the media root
    pub preview_image: Option<String>,
    /// Featured video for the hero section
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Stored path for a still image, if one is set.
    pub fn still(&self, kind: StillKind) -> Option<&str> {
        let field = match kind {
            StillKind::Thumbnail => &self.thumbnail,
            StillKind::Preview => &self.preview_image,
        };
        field.as_deref().filter(|p| !p.is_empty())
    }

    pub fn set_still(&mut self, kind: StillKind, relative_path: impl Into<String>) {
        let value = Some(relative_path.into());
        match kind {
            StillKind::Thumbnail => self.thumbnail = value,
            StillKind::Preview => self.preview_image = value,
        }
    }

    /// True when either still image is missing.
    pub fn needs_stills(&self) -> bool {
        self.still(StillKind::Thumbnail).is_none() || self.still(StillKind::Preview).is_none()
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// One resolution-specific file of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFile {
    pub id: VideoFileId,
    pub video_id: VideoId,
    pub resolution: Resolution,
    /// Path relative to the media root
    pub file: String,
    /// Size in bytes
    pub file_size: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Bitrate in kbps
    pub bitrate: Option<u32>,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

impl VideoFile {
    pub fn is_original(&self) -> bool {
        self.resolution.is_original()
    }

    pub fn has_file(&self) -> bool {
        !self.file.trim().is_empty()
    }

    /// Absolute path of the stored file under `media_root`.
    pub fn absolute_path(&self, media_root: impl AsRef<Path>) -> PathBuf {
        media_root.as_ref().join(&self.file)
    }

    /// Filename without its extension (`videos/movie.mp4` -> `movie`).
    pub fn base_name(&self) -> Option<String> {
        Path::new(&self.file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }

    /// The original file among a video's files.
    pub fn original(files: &[VideoFile]) -> Option<&VideoFile> {
        files.iter().find(|f| f.is_original())
    }

    /// The file for `resolution`, falling back to the original when that
    /// resolution has not been produced.
    pub fn for_resolution(files: &[VideoFile], resolution: Resolution) -> Option<&VideoFile> {
        files
            .iter()
            .find(|f| f.resolution == resolution && f.has_file())
            .or_else(|| Self::original(files).filter(|f| f.has_file()))
    }

    /// Resolution tags present, ordered by tag name.
    pub fn available_resolutions(files: &[VideoFile]) -> Vec<Resolution> {
        let mut tags: Vec<Resolution> = files.iter().map(|f| f.resolution).collect();
        tags.sort_by_key(|r| r.as_str());
        tags.dedup();
        tags
    }
}

impl fmt::Display for VideoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.video_id, self.resolution)
    }
}

/// Insert payload for a video file row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideoFile {
    pub video_id: VideoId,
    pub resolution: Resolution,
    pub file: String,
    pub file_size: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bitrate: Option<u32>,
    pub is_processed: bool,
}

impl NewVideoFile {
    pub fn new(video_id: VideoId, resolution: Resolution, file: impl Into<String>) -> Self {
        Self {
            video_id,
            resolution,
            file: file.into(),
            file_size: None,
            width: None,
            height: None,
            bitrate: None,
            is_processed: false,
        }
    }

    pub fn with_size(mut self, bytes: u64) -> Self {
        self.file_size = Some(bytes as i64);
        self
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_bitrate(mut self, kbps: Option<u32>) -> Self {
        self.bitrate = kbps;
        self
    }

    pub fn processed(mut self) -> Self {
        self.is_processed = true;
        self
    }
}
