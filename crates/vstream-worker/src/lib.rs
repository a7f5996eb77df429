//! HLS transcoding worker.
//!
//! This crate provides:
//! - The transcode orchestrator: stills, then the rendition ladder in order
//! - Idempotent rendition registration and still-image extraction
//! - Video file lifecycle hooks (enqueue on upload, file removal on delete)
//! - A single-job executor with crash recovery, retry/DLQ and graceful shutdown

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod registrar;
pub mod stills;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::WorkerConfig;
pub use context::ProcessingContext;
pub use error::{WorkerError, WorkerResult};
pub use events::VideoFileEvents;
pub use executor::{JobDisposition, JobExecutor};
pub use logging::{JobLogger, TranscodeObserver};
pub use orchestrator::{TranscodeOrchestrator, TranscodeReport};
pub use registrar::{RenditionOutcome, RenditionRegistrar};
pub use stills::StillExtractor;
