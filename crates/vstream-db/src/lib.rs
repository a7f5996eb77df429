//! Relational store for the video catalog.
//!
//! This crate provides:
//! - The `VideoRepository` trait the worker depends on
//! - An sqlx/SQLite implementation with a hard `(video_id, resolution)`
//!   uniqueness constraint
//! - Atomic "insert unless it already exists" for rendition rows

pub mod error;
pub mod repository;
pub mod schema;
pub mod sqlite;

pub use error::{DbError, DbResult};
pub use repository::{InsertOutcome, NewVideo, VideoRepository};
pub use sqlite::SqliteVideoRepository;

// Re-exported so callers can classify driver errors without a direct dependency.
pub use sqlx;
