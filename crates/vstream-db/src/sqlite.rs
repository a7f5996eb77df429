//! SQLite-backed repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use vstream_models::{
    Genre, GenreId, NewVideoFile, Resolution, Video, VideoFile, VideoFileId, VideoId,
};

use crate::error::{DbError, DbResult};
use crate::repository::{InsertOutcome, NewVideo, VideoRepository};
use crate::schema::SCHEMA;

const VIDEO_COLUMNS: &str = "id, title, description, genre_id, duration, release_year, \
     thumbnail, preview_image, is_featured, created_at, updated_at";

const VIDEO_FILE_COLUMNS: &str = "id, video_id, resolution, file, file_size, width, height, \
     bitrate, is_processed, created_at";

#[derive(Debug, sqlx::FromRow)]
struct GenreRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Genre {
            id: GenreId(row.id),
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: i64,
    title: String,
    description: String,
    genre_id: i64,
    duration: Option<i64>,
    release_year: Option<i64>,
    thumbnail: Option<String>,
    preview_image: Option<String>,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: VideoId(row.id),
            title: row.title,
            description: row.description,
            genre_id: GenreId(row.genre_id),
            duration: row.duration.and_then(to_u32),
            release_year: row.release_year.and_then(to_u32),
            thumbnail: row.thumbnail,
            preview_image: row.preview_image,
            is_featured: row.is_featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VideoFileRow {
    id: i64,
    video_id: i64,
    resolution: String,
    file: String,
    file_size: Option<i64>,
    width: Option<i64>,
    height: Option<i64>,
    bitrate: Option<i64>,
    is_processed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<VideoFileRow> for VideoFile {
    type Error = DbError;

    fn try_from(row: VideoFileRow) -> Result<Self, Self::Error> {
        let resolution = Resolution::from_str(&row.resolution)
            .map_err(|e| DbError::decode(format!("video_files.id={}: {}", row.id, e)))?;

        Ok(VideoFile {
            id: VideoFileId(row.id),
            video_id: VideoId(row.video_id),
            resolution,
            file: row.file,
            file_size: row.file_size,
            width: row.width.and_then(to_u32),
            height: row.height.and_then(to_u32),
            bitrate: row.bitrate.and_then(to_u32),
            is_processed: row.is_processed,
            created_at: row.created_at,
        })
    }
}

fn to_u32(v: i64) -> Option<u32> {
    u32::try_from(v).ok()
}

/// Repository over an SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteVideoRepository {
    pool: SqlitePool,
}

impl SqliteVideoRepository {
    /// Connect to `database_url` (e.g. `sqlite:///app/data/vstream.db`),
    /// creating the file if needed, and apply the schema.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        info!("Connected to video store at {}", database_url);
        Ok(repo)
    }

    /// Private in-memory database. A single long-lived connection keeps the
    /// database alive for the lifetime of the pool.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> DbResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Video store schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl VideoRepository for SqliteVideoRepository {
    async fn create_genre(&self, name: &str, slug: &str) -> DbResult<Genre> {
        let row: GenreRow = sqlx::query_as(
            "INSERT INTO genres (name, slug, created_at) VALUES (?, ?, ?) \
             RETURNING id, name, slug, created_at",
        )
        .bind(name)
        .bind(slug)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn create_video(&self, video: &NewVideo) -> DbResult<Video> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO videos (title, description, genre_id, duration, release_year, \
             is_featured, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {VIDEO_COLUMNS}"
        );

        let row: VideoRow = sqlx::query_as(&sql)
            .bind(&video.title)
            .bind(&video.description)
            .bind(video.genre_id.get())
            .bind(video.duration.map(i64::from))
            .bind(video.release_year.map(i64::from))
            .bind(video.is_featured)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get_video(&self, id: VideoId) -> DbResult<Option<Video>> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?");
        let row: Option<VideoRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn save_video_stills(&self, video: &Video) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE videos SET thumbnail = ?, preview_image = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&video.thumbnail)
        .bind(&video.preview_image)
        .bind(Utc::now())
        .bind(video.id.get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("video {}", video.id)));
        }
        Ok(())
    }

    async fn get_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>> {
        let sql = format!("SELECT {VIDEO_FILE_COLUMNS} FROM video_files WHERE id = ?");
        let row: Option<VideoFileRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(VideoFile::try_from).transpose()
    }

    async fn list_video_files(&self, video_id: VideoId) -> DbResult<Vec<VideoFile>> {
        let sql = format!(
            "SELECT {VIDEO_FILE_COLUMNS} FROM video_files WHERE video_id = ? \
             ORDER BY resolution"
        );
        let rows: Vec<VideoFileRow> = sqlx::query_as(&sql)
            .bind(video_id.get())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(VideoFile::try_from).collect()
    }

    async fn rendition_exists(&self, video_id: VideoId, resolution: Resolution) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM video_files WHERE video_id = ? AND resolution = ?",
        )
        .bind(video_id.get())
        .bind(resolution.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_video_file(&self, file: &NewVideoFile) -> DbResult<InsertOutcome> {
        let sql = format!(
            "INSERT INTO video_files (video_id, resolution, file, file_size, width, height, \
             bitrate, is_processed, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (video_id, resolution) DO NOTHING \
             RETURNING {VIDEO_FILE_COLUMNS}"
        );

        let result: Result<Option<VideoFileRow>, sqlx::Error> = sqlx::query_as(&sql)
            .bind(file.video_id.get())
            .bind(file.resolution.as_str())
            .bind(&file.file)
            .bind(file.file_size)
            .bind(file.width.map(i64::from))
            .bind(file.height.map(i64::from))
            .bind(file.bitrate.map(i64::from))
            .bind(file.is_processed)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await;

        match result.map_err(DbError::from) {
            Ok(Some(row)) => Ok(InsertOutcome::Created(VideoFile::try_from(row)?)),
            Ok(None) => {
                debug!(
                    video_id = %file.video_id,
                    resolution = %file.resolution,
                    "Video file already exists, insert skipped"
                );
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) if e.is_unique_violation() => Ok(InsertOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    async fn delete_video_file(&self, id: VideoFileId) -> DbResult<Option<VideoFile>> {
        let sql = format!("DELETE FROM video_files WHERE id = ? RETURNING {VIDEO_FILE_COLUMNS}");
        let row: Option<VideoFileRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(VideoFile::try_from).transpose()
    }
}
