//! Filesystem utilities for rendition artifacts.
//!
//! Output directories live under a media root that is shared between worker
//! instances, so directory creation has to tolerate concurrent creators.

use std::io::ErrorKind;
use std::path::{Component, Path};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Create `dir` and any missing parents. Succeeds if it already exists,
/// including when another worker created it concurrently.
pub async fn ensure_dir(dir: impl AsRef<Path>) -> MediaResult<()> {
    let dir = dir.as_ref();
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Total size in bytes of the regular files directly inside `dir`.
///
/// Subdirectories are not descended into.
pub async fn directory_size(dir: impl AsRef<Path>) -> MediaResult<u64> {
    let mut entries = fs::read_dir(dir.as_ref()).await?;
    let mut total = 0u64;

    while let Some(entry) = entries.next_entry().await? {
        // Follows symlinks, so a link to a regular file counts.
        let metadata = match fs::metadata(entry.path()).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(MediaError::from(e)),
        };
        if metadata.is_file() {
            total += metadata.len();
        }
    }

    Ok(total)
}

/// Size of a single file, or `None` if it does not exist.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<Option<u64>> {
    match fs::metadata(path.as_ref()).await {
        Ok(m) if m.is_file() => Ok(Some(m.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Path of `absolute` relative to `media_root`, with `/` separators, for
/// storage in a file reference field.
pub fn media_relative_path(
    absolute: impl AsRef<Path>,
    media_root: impl AsRef<Path>,
) -> MediaResult<String> {
    let absolute = absolute.as_ref();
    let media_root = media_root.as_ref();

    let relative = absolute
        .strip_prefix(media_root)
        .map_err(|_| MediaError::OutsideMediaRoot {
            path: absolute.to_path_buf(),
            root: media_root.to_path_buf(),
        })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        return Err(MediaError::OutsideMediaRoot {
            path: absolute.to_path_buf(),
            root: media_root.to_path_buf(),
        });
    }

    Ok(parts.join("/"))
}

/// Remove a regular file. Returns `false` when there was nothing to remove.
pub async fn remove_file_if_present(path: impl AsRef<Path>) -> MediaResult<bool> {
    let path = path.as_ref();
    match fs::metadata(path).await {
        Ok(m) if m.is_file() => {}
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(MediaError::from(e)),
    }

    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MediaError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_directory_size_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("playlist.m3u8"), b"#EXTM3U\n").await.unwrap();
        fs::write(dir.path().join("segment_000.ts"), vec![0u8; 100]).await.unwrap();
        fs::create_dir(dir.path().join("nested")).await.unwrap();
        fs::write(dir.path().join("nested").join("ignored.ts"), vec![0u8; 1000])
            .await
            .unwrap();

        assert_eq!(directory_size(dir.path()).await.unwrap(), 8 + 100);
    }

    #[tokio::test]
    async fn test_directory_size_missing_dir_errors() {
        let dir = TempDir::new().unwrap();
        assert!(directory_size(dir.path().join("absent")).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("hls").join("720p").join("movie");

        let (a, b) = tokio::join!(ensure_dir(&target), ensure_dir(&target));
        a.unwrap();
        b.unwrap();
        ensure_dir(&target).await.unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_media_relative_path() {
        let rel = media_relative_path(
            "/app/media/hls/1080p/movie/playlist.m3u8",
            "/app/media",
        )
        .unwrap();
        assert_eq!(rel, "hls/1080p/movie/playlist.m3u8");

        assert!(media_relative_path("/elsewhere/movie.mp4", "/app/media").is_err());
        assert!(media_relative_path("/app/media", "/app/media").is_err());
    }

    #[tokio::test]
    async fn test_remove_file_if_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie.mp4");
        fs::write(&path, b"data").await.unwrap();

        assert_eq!(file_size(&path).await.unwrap(), Some(4));
        assert!(remove_file_if_present(&path).await.unwrap());
        assert!(!remove_file_if_present(&path).await.unwrap());
        assert_eq!(file_size(&path).await.unwrap(), None);
        assert!(!remove_file_if_present(dir.path()).await.unwrap());
    }
}
