//! Thumbnail and preview still generation.

use std::path::{Path, PathBuf};

use vstream_models::StillKind;

use crate::command::{Encoder, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::ensure_dir;

/// `<media_root>/thumbnails/<base>_thumb.jpg` or
/// `<media_root>/previews/<base>_preview.jpg`.
pub fn still_output_path(media_root: &Path, kind: StillKind, base_name: &str) -> PathBuf {
    media_root.join(kind.dir_name()).join(kind.file_name(base_name))
}

/// Single JPEG frame at the kind's timestamp, fixed width, aspect kept.
pub fn build_still_command(source: &Path, output: &Path, kind: StillKind) -> FfmpegCommand {
    FfmpegCommand::new(source, output)
        .output_seek(kind.timestamp())
        .single_frame()
        .video_filter(format!("scale={}:-1", kind.scale_width()))
}

/// Extract one still from `source` into the media root.
///
/// Returns the absolute path of the written image.
pub async fn generate_still(
    encoder: &dyn Encoder,
    source: &Path,
    media_root: &Path,
    kind: StillKind,
    base_name: &str,
) -> MediaResult<PathBuf> {
    let output = still_output_path(media_root, kind, base_name);
    if let Some(dir) = output.parent() {
        ensure_dir(dir).await?;
    }

    let cmd = build_still_command(source, &output, kind);
    encoder.run(&cmd).await?;

    if !tokio::fs::try_exists(&output).await? {
        return Err(MediaError::FileNotFound(output));
    }

    Ok(output)
}
