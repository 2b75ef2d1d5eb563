//! # Gather Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for storage and source adapters
//! - The normalizer (raw record -> canonical draft)
//! - The deduplication engine (authoritative id + fuzzy matching)
//! - The ingestion coordinator and unified event creation service
//! - The chat assistant's event tool contract
//!
//! ## Architecture Principles
//! - Only depends on `gather-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod chat;
pub mod coordinator;
pub mod creation;
pub mod dedup;
pub mod normalize;
pub mod ports;

#[cfg(test)]
pub(crate) mod testutil;

pub use chat::ChatTools;
pub use coordinator::{IngestOutcome, IngestTarget, IngestionCoordinator};
pub use creation::{derived_source_id, CreationOutcome, EventCreationService};
pub use dedup::{DedupEngine, SweepOutcome};
pub use normalize::{normalize, RejectReason, SourceContext};
pub use ports::{
    AdapterRegistry, CalendarRepository, EventRepository, EventSourceAdapter, SourceRepository,
};
