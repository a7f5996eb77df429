//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Number of trailing stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek on the output side (frame-accurate).
    pub fn output_seek(self, timestamp: impl Into<String>) -> Self {
        self.output_arg("-ss").output_arg(timestamp)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set video bitrate.
    pub fn video_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:v").output_arg(bitrate)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-vframes").output_arg("1")
    }

    /// Output file path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Input file
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        // Output args
        args.extend(self.output_args.iter().cloned());

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Executes built FFmpeg commands.
///
/// Implemented by [`FfmpegRunner`] for real processes; the seam lets the
/// pipeline be driven without a system FFmpeg.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run one command to completion. A non-zero exit is an error.
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()>;
}

/// Runner for FFmpeg commands with timeout and captured diagnostics.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// FFmpeg binary name or path
    binary: PathBuf,
    /// Timeout for one invocation
    timeout: Option<Duration>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner using `ffmpeg` from PATH.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            timeout: None,
        }
    }

    /// Use a specific FFmpeg binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set timeout. The child process is killed when it expires.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn execute(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let binary = which::which(&self.binary)
            .map_err(|_| MediaError::FfmpegNotFound(self.binary.display().to_string()))?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("FFmpeg timed out after {:?}, killing process", limit);
                    return Err(MediaError::Timeout(limit));
                }
            },
            None => child.wait_with_output().await?,
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = stderr_tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_LINES);
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr),
                output.status.code(),
            ))
        }
    }
}

#[async_trait]
impl Encoder for FfmpegRunner {
    async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.execute(cmd).await
    }
}

/// Last `max_lines` non-empty lines of captured stderr.
fn stderr_tail(stderr: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let binary = binary.as_ref();
    which::which(binary).map_err(|_| MediaError::FfmpegNotFound(binary.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_order() {
        let cmd = FfmpegCommand::new("input.mp4", "output.jpg")
            .output_seek("00:00:03")
            .single_frame()
            .video_filter("scale=320:-1");

        assert_eq!(
            cmd.build_args(),
            vec![
                "-i", "input.mp4", "-ss", "00:00:03", "-vframes", "1", "-vf", "scale=320:-1",
                "-y", "output.jpg"
            ]
        );
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = "a\n\nb\nc\nd\n";
        assert_eq!(stderr_tail(stderr, 2), "c\nd");
        assert_eq!(stderr_tail(stderr, 10), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let runner = FfmpegRunner::new().with_binary("/nonexistent/ffmpeg-binary");
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound(_)));
    }

    /// Write an executable shell script standing in for the ffmpeg binary.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_captures_stderr_and_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let binary = fake_ffmpeg(&dir, "echo 'Invalid data found' >&2\nexit 3");
        let runner = FfmpegRunner::new().with_binary(binary);

        let err = runner
            .run(&FfmpegCommand::new("in.mp4", "out.m3u8"))
            .await
            .unwrap_err();

        match err {
            MediaError::FfmpegFailed {
                stderr, exit_code, ..
            } => {
                assert_eq!(stderr.as_deref(), Some("Invalid data found"));
                assert_eq!(exit_code, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_exit_is_ok() {
        let dir = tempfile::TempDir::new().unwrap();
        let binary = fake_ffmpeg(&dir, "exit 0");
        let runner = FfmpegRunner::new().with_binary(binary);

        runner
            .run(&FfmpegCommand::new("in.mp4", "out.m3u8"))
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_encoder_is_killed_at_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let binary = fake_ffmpeg(&dir, "exec sleep 30");
        let limit = Duration::from_millis(300);
        let runner = FfmpegRunner::new()
            .with_binary(binary)
            .with_timeout(Some(limit));

        let started = std::time::Instant::now();
        let err = runner
            .run(&FfmpegCommand::new("in.mp4", "out.m3u8"))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Timeout(d) if d == limit));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(err.to_string(), "Operation timed out after 300ms");
    }
}
