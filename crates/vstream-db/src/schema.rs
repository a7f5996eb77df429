//! Table definitions.

/// Statements applied in order by [`crate::SqliteVideoRepository::migrate`].
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS genres (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL UNIQUE,
        slug        TEXT    NOT NULL UNIQUE,
        created_at  TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        title          TEXT    NOT NULL,
        description    TEXT    NOT NULL DEFAULT '',
        genre_id       INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
        duration       INTEGER,
        release_year   INTEGER,
        thumbnail      TEXT,
        preview_image  TEXT,
        is_featured    INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT    NOT NULL,
        updated_at     TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS video_files (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id      INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
        resolution    TEXT    NOT NULL
                      CHECK (resolution IN ('original', '1080p', '720p', '360p', '120p')),
        file          TEXT    NOT NULL,
        file_size     INTEGER,
        width         INTEGER,
        height        INTEGER,
        bitrate       INTEGER,
        is_processed  INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT    NOT NULL,
        UNIQUE (video_id, resolution)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_videos_created_at ON videos (created_at DESC)",
];
