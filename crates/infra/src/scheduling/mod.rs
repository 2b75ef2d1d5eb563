//! Scheduling infrastructure for automated ingestion
//!
//! - `ingest_queue`: the background task queue (one unit = one source or
//!   calendar sync) with classify-and-requeue retry
//! - `sweep_scheduler`: the periodic sweeps that decide what is due (import
//!   sweep) and clean up cross-source duplicates (dedup sweep)
//!
//! All schedulers use explicit lifecycle management: start/stop, tracked
//! join handles, cancellation tokens, and timeouts on async operations.

pub mod error;
pub mod ingest_queue;
pub mod sweep_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use ingest_queue::{
    calculate_backoff, is_terminal, IngestQueue, IngestQueueConfig, IngestSubmitter, JobTarget,
};
pub use sweep_scheduler::{ImportSweep, SweepScheduler};
