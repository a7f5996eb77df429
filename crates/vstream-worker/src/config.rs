//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use vstream_models::encoding::DEFAULT_MEDIA_ROOT;
use vstream_models::{EncodingConfig, Resolution, ResolutionLadder};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Storage root; database paths are relative to it
    pub media_root: PathBuf,
    /// sqlx connection string for the video store
    pub database_url: String,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    /// Codec, preset and segment settings shared by all renditions
    pub encoding: EncodingConfig,
    /// Hard limit per encoder invocation; `None` waits forever
    pub encoder_timeout: Option<Duration>,
    /// Renditions produced per job, in order
    pub ladder: ResolutionLadder,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// Grace period for the running job after a shutdown signal
    pub shutdown_timeout: Duration,
    /// Base delay before a retryable failure is requeued; doubles per attempt
    pub retry_delay: Duration,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            database_url: "sqlite://vstream.db".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            encoding: EncodingConfig::default(),
            encoder_timeout: Some(Duration::from_secs(6 * 3600)),
            ladder: ResolutionLadder::default(),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(6 * 3600 + 300),
            shutdown_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(30),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let mut encoding = defaults.encoding;
        if let Ok(preset) = std::env::var("FFMPEG_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        let ladder = match std::env::var("TRANSCODE_RESOLUTIONS") {
            Ok(list) => ladder_from_list(&defaults.ladder, &list)?,
            Err(_) => defaults.ladder,
        };

        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(addr) if !addr.trim().is_empty() => Some(addr.trim().parse().map_err(|e| {
                WorkerError::config_error(format!("METRICS_ADDR '{}': {}", addr, e))
            })?),
            _ => None,
        };

        Ok(Self {
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            encoding,
            encoder_timeout: match std::env::var("ENCODER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.encoder_timeout,
            },
            ladder,
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            claim_min_idle: std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.claim_min_idle),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            retry_delay: std::env::var("WORKER_RETRY_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
            metrics_addr,
        })
    }
}

/// Restrict `ladder` to a comma-separated list of resolution tags.
///
/// The result keeps ladder order. `original` is not a transcode target.
pub fn ladder_from_list(ladder: &ResolutionLadder, list: &str) -> WorkerResult<ResolutionLadder> {
    let mut wanted = Vec::new();
    for tag in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let resolution: Resolution = tag
            .parse()
            .map_err(|e| WorkerError::config_error(format!("TRANSCODE_RESOLUTIONS: {}", e)))?;
        if resolution.is_original() {
            return Err(WorkerError::config_error(
                "TRANSCODE_RESOLUTIONS: 'original' cannot be a transcode target",
            ));
        }
        wanted.push(resolution);
    }

    let restricted = ladder.restricted_to(&wanted);
    if restricted.is_empty() {
        return Err(WorkerError::config_error(
            "TRANSCODE_RESOLUTIONS selects no renditions",
        ));
    }
    Ok(restricted)
}
