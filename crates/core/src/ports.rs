//! Port interfaces for the ingestion pipeline
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use gather_domain::{
    CalendarImport, Event, EventDraft, ExtractionStatus, GatherError, RawEventRecord, Result,
    SourceDescriptor, SourceRunState,
};

use crate::coordinator::IngestTarget;

/// Trait for persisting and querying canonical events
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event from a draft. Enforces the ownership invariant and
    /// the (source_name, source_id) uniqueness constraint; keeps the
    /// computed occupancy range in sync with start/end.
    async fn insert_event(&self, draft: &EventDraft) -> Result<Event>;

    /// Authoritative dedup lookup by exact source attribution pair.
    async fn find_by_source_ref(&self, source_name: &str, source_id: &str)
        -> Result<Option<Event>>;

    /// All events starting on the given calendar day.
    async fn find_by_day(&self, day: NaiveDate) -> Result<Vec<Event>>;

    /// Events starting within a time range, ordered by start time.
    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>>;

    /// Substring search over title, description, and venue.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Event>>;

    /// Source-attributed events starting within a day window, for the
    /// cross-source dedup sweep.
    async fn find_source_attributed(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>>;

    /// Delete an event.
    async fn delete_event(&self, id: &str) -> Result<()>;
}

/// Trait for source descriptor configuration + run state
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Fetch a descriptor by id. Returns `NotFound` when it was deleted.
    async fn get_source(&self, id: &str) -> Result<SourceDescriptor>;

    /// All enabled descriptors.
    async fn list_enabled(&self) -> Result<Vec<SourceDescriptor>>;

    /// Persist run bookkeeping. Called after every run, failed ones included.
    async fn update_run_state(&self, id: &str, run_state: &SourceRunState) -> Result<()>;

    /// Create a descriptor.
    async fn insert_source(&self, descriptor: &SourceDescriptor) -> Result<()>;
}

/// Trait for calendar import configuration
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    /// Fetch a calendar by id. Returns `NotFound` when it was deleted.
    async fn get_calendar(&self, id: &str) -> Result<CalendarImport>;

    /// Look up a calendar by its rotating feed token.
    async fn find_by_ical_token(&self, token: &str) -> Result<Option<CalendarImport>>;

    /// All calendars with import enabled.
    async fn list_import_enabled(&self) -> Result<Vec<CalendarImport>>;

    /// Record the outcome of an import run.
    async fn update_import_outcome(
        &self,
        id: &str,
        last_imported_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<()>;

    /// Persist an extraction status transition (pending -> processing ->
    /// completed | failed) so polling clients can observe progress.
    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()>;

    /// Create a calendar.
    async fn insert_calendar(&self, calendar: &CalendarImport) -> Result<()>;

    /// Find the calendar owned by `owner_id` with the given name, creating
    /// it when absent. Used to own scraper-created events.
    async fn find_or_create_owned(&self, owner_id: &str, name: &str) -> Result<CalendarImport>;
}

/// Trait for one kind of source adapter.
///
/// Adapters fetch raw records from an external source and never let raw
/// errors escape: failures come back as typed [`GatherError`] values for the
/// coordinator to record and the scheduler to classify.
#[async_trait]
pub trait EventSourceAdapter: Send + Sync {
    /// Adapter kind identifier ("ical", "google", "scrape", "extract").
    fn kind(&self) -> &'static str;

    /// Fetch the raw records for one ingest target.
    async fn fetch(&self, target: &IngestTarget) -> Result<Vec<RawEventRecord>>;
}

/// Static registry resolving adapter kinds to implementations.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn EventSourceAdapter>>,
}

impl AdapterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn EventSourceAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    /// Resolve an adapter by kind.
    ///
    /// # Errors
    /// Returns `Config` when no adapter is registered for the kind; a
    /// misconfigured target is terminal, not retriable.
    pub fn get(&self, kind: &str) -> Result<Arc<dyn EventSourceAdapter>> {
        self.adapters
            .get(kind)
            .cloned()
            .ok_or_else(|| GatherError::Config(format!("no adapter registered for kind: {kind}")))
    }
}
