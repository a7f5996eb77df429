//! FFmpeg CLI wrapper for video transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - HLS output planning and rendition commands
//! - Thumbnail/preview still extraction
//! - A process runner with timeout and captured diagnostics
//! - Output directory scanning and media-root relative paths

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod hls;
pub mod runner;
pub mod thumbnail;

pub use command::{check_ffmpeg, Encoder, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{directory_size, ensure_dir, file_size, media_relative_path, remove_file_if_present};
pub use hls::{build_hls_command, plan_hls_output, prepare_hls_output, HlsOutputPaths};
pub use runner::run_conversion;
pub use thumbnail::{build_still_command, generate_still, still_output_path};
