//! Failure boundary around one rendition encode.

use std::time::Instant;

use metrics::histogram;
use tracing::{error, info};

use crate::command::{Encoder, FfmpegCommand};
use crate::error::MediaError;

/// Encoder wall-clock time per rendition.
pub const ENCODER_DURATION_SECONDS: &str = "vstream_encoder_duration_seconds";

/// Run one HLS conversion and report whether it succeeded.
///
/// Never returns an error: non-zero exits, a missing binary, timeouts and
/// spawn failures are logged with whatever diagnostics were captured and
/// reported as `false`, so the caller can move on to the next rendition.
pub async fn run_conversion(
    encoder: &dyn Encoder,
    cmd: &FfmpegCommand,
    resolution: &str,
    video_title: &str,
) -> bool {
    info!(
        resolution = %resolution,
        video = %video_title,
        "Converting to HLS {} for video {}...", resolution, video_title
    );

    let started = Instant::now();
    let result = encoder.run(cmd).await;
    histogram!(ENCODER_DURATION_SECONDS, "resolution" => resolution.to_string())
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            info!(resolution = %resolution, "Successfully converted to HLS {}", resolution);
            true
        }
        Err(MediaError::FfmpegFailed {
            stderr, exit_code, ..
        }) => {
            error!(
                resolution = %resolution,
                exit_code = ?exit_code,
                "Error converting to HLS {}: {}",
                resolution,
                stderr.as_deref().unwrap_or("<no stderr captured>")
            );
            false
        }
        Err(e) => {
            error!(resolution = %resolution, "Unexpected error for {}: {}", resolution, e);
            false
        }
    }
}
