//! Shared data models for the VStream backend.
//!
//! This crate provides Serde-serializable types for:
//! - Videos, genres and per-resolution video files
//! - The resolution tag set and the rendition ladder
//! - Encoding, HLS and still-image constants

pub mod encoding;
pub mod resolution;
pub mod video;

// Re-export common types
pub use encoding::{EncodingConfig, StillKind};
pub use resolution::{ParseResolutionError, RenditionSpec, Resolution, ResolutionLadder};
pub use video::{Genre, GenreId, NewVideoFile, Video, VideoFile, VideoFileId, VideoId};
