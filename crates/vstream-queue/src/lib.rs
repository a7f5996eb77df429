//! Redis Streams job queue.
//!
//! This crate provides:
//! - Transcode job enqueueing via Redis Streams with idempotency keys
//! - Consumer-group reads, acknowledgement and reclaiming of stale jobs
//! - Retry counters, requeueing and a dead letter stream
//! - The `JobSubmitter` seam used by the file lifecycle hooks

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{QueueJob, TranscodeVideoJob};
pub use queue::{JobQueue, JobSubmitter, QueueConfig};
