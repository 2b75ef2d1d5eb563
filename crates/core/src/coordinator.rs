//! Ingestion coordinator
//!
//! Orchestrates fetch -> normalize -> dedup -> persist for one source or
//! calendar at a time. Run bookkeeping is updated whatever the outcome: a
//! failed run is still a recorded run. Adapter-level failures abort the
//! batch and propagate to the retry layer; per-record problems are logged
//! and skipped.

use std::sync::Arc;

use chrono::Utc;
use gather_domain::{
    CalendarImport, EventOrigin, ExtractionStatus, GatherError, ImportKind, RawEventRecord,
    Result, SourceDescriptor,
};
use tracing::{debug, info, instrument, warn};

use crate::creation::EventCreationService;
use crate::normalize::{normalize, SourceContext};
use crate::ports::{AdapterRegistry, CalendarRepository, SourceRepository};

/// One unit of ingest work: a scraper source or an importing calendar.
#[derive(Debug, Clone)]
pub enum IngestTarget {
    Source(SourceDescriptor),
    Calendar(CalendarImport),
}

impl IngestTarget {
    /// Which registered adapter handles this target. Apple feeds are plain
    /// iCal under the hood.
    #[must_use]
    pub fn adapter_kind(&self) -> &'static str {
        match self {
            Self::Source(_) => "scrape",
            Self::Calendar(calendar) => match calendar.import_kind {
                Some(ImportKind::Google) => "google",
                Some(ImportKind::Extract) => "extract",
                _ => "ical",
            },
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Source(source) => &source.id,
            Self::Calendar(calendar) => &calendar.id,
        }
    }
}

/// Result of one coordinator run.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub success: bool,
    /// Records processed: persisted or recognized as already present.
    pub count: usize,
    pub error: Option<String>,
}

impl IngestOutcome {
    fn skipped() -> Self {
        Self { success: true, count: 0, error: None }
    }
}

/// Wraps every adapter invocation and turns run results into persisted
/// state visible to operators.
pub struct IngestionCoordinator {
    adapters: AdapterRegistry,
    creation: Arc<EventCreationService>,
    sources: Arc<dyn SourceRepository>,
    calendars: Arc<dyn CalendarRepository>,
}

impl IngestionCoordinator {
    pub fn new(
        adapters: AdapterRegistry,
        creation: Arc<EventCreationService>,
        sources: Arc<dyn SourceRepository>,
        calendars: Arc<dyn CalendarRepository>,
    ) -> Self {
        Self { adapters, creation, sources, calendars }
    }

    /// Run one scraper source.
    ///
    /// # Errors
    /// `NotFound` when the descriptor was deleted between scheduling and
    /// execution (never retried); adapter errors propagate after being
    /// recorded in the source's run state.
    #[instrument(skip(self))]
    pub async fn run_source(&self, source_id: &str) -> Result<IngestOutcome> {
        let descriptor = self.sources.get_source(source_id).await?;
        if !descriptor.enabled {
            debug!(source = %descriptor.name, "source disabled, skipping");
            return Ok(IngestOutcome::skipped());
        }

        info!(source = %descriptor.name, url = %descriptor.list_url(), "starting source run");

        let target = IngestTarget::Source(descriptor.clone());
        let now = Utc::now();
        let mut run_state = descriptor.run_state.clone();
        run_state.last_run_at = Some(now);

        let fetched = match self.adapters.get(target.adapter_kind()) {
            Ok(adapter) => adapter.fetch(&target).await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(records) => {
                let ctx = SourceContext {
                    source_name: Some(descriptor.slug.clone()),
                    source_url: None,
                    calendar_id: descriptor.calendar_id.clone(),
                };
                let count = self.persist_batch(&records, &ctx).await;

                run_state.last_success_at = Some(now);
                run_state.last_run_count = count as i64;
                run_state.total_events += count as i64;
                run_state.last_error = None;
                self.sources.update_run_state(&descriptor.id, &run_state).await?;

                info!(source = %descriptor.name, count, "source run completed");
                Ok(IngestOutcome { success: true, count, error: None })
            }
            Err(e) => {
                run_state.last_error = Some(e.to_string());
                self.sources.update_run_state(&descriptor.id, &run_state).await?;

                warn!(source = %descriptor.name, error = %e, "source run failed");
                Err(e)
            }
        }
    }

    /// Run one importing calendar (iCal/Apple feed, Google, or AI
    /// extraction).
    ///
    /// Extraction calendars additionally get their status transitions
    /// persisted (processing -> completed | failed) so a polling client can
    /// observe progress.
    ///
    /// # Errors
    /// `NotFound` for deleted calendars; `Config` for enabled imports with
    /// no usable source location; adapter errors propagate after being
    /// recorded.
    #[instrument(skip(self))]
    pub async fn run_calendar(&self, calendar_id: &str) -> Result<IngestOutcome> {
        let calendar = self.calendars.get_calendar(calendar_id).await?;
        if !calendar.import_enabled {
            debug!(calendar = %calendar.name, "import disabled, skipping");
            return Ok(IngestOutcome::skipped());
        }
        if !calendar.has_source_location() {
            let err = GatherError::Config(format!(
                "calendar {} has no usable import source location",
                calendar.id
            ));
            self.calendars
                .update_import_outcome(&calendar.id, None, Some(&err.to_string()))
                .await?;
            return Err(err);
        }

        let is_extract = calendar.import_kind == Some(ImportKind::Extract);
        if is_extract {
            self.calendars
                .set_extraction_status(&calendar.id, ExtractionStatus::Processing, None)
                .await?;
        }

        info!(calendar = %calendar.name, kind = ?calendar.import_kind, "starting calendar import");

        let target = IngestTarget::Calendar(calendar.clone());
        let fetched = match self.adapters.get(target.adapter_kind()) {
            Ok(adapter) => adapter.fetch(&target).await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(records) => {
                let source_name = calendar
                    .import_kind
                    .map_or_else(|| "ical".to_string(), |kind| kind.as_str().to_string());
                let ctx = SourceContext {
                    source_name: Some(source_name),
                    source_url: calendar.import_url.clone(),
                    calendar_id: Some(calendar.id.clone()),
                };
                let count = self.persist_batch(&records, &ctx).await;

                self.calendars
                    .update_import_outcome(&calendar.id, Some(Utc::now()), None)
                    .await?;
                if is_extract {
                    self.calendars
                        .set_extraction_status(&calendar.id, ExtractionStatus::Completed, None)
                        .await?;
                }

                info!(calendar = %calendar.name, count, "calendar import completed");
                Ok(IngestOutcome { success: true, count, error: None })
            }
            Err(e) => {
                self.calendars
                    .update_import_outcome(&calendar.id, None, Some(&e.to_string()))
                    .await?;
                if is_extract {
                    self.calendars
                        .set_extraction_status(
                            &calendar.id,
                            ExtractionStatus::Failed,
                            Some(&e.to_string()),
                        )
                        .await?;
                }

                warn!(calendar = %calendar.name, error = %e, "calendar import failed");
                Err(e)
            }
        }
    }

    /// Normalize and persist one batch. Rejected records and per-record
    /// persistence failures are logged and skipped; duplicates count as
    /// processed.
    async fn persist_batch(&self, records: &[RawEventRecord], ctx: &SourceContext) -> usize {
        let mut processed = 0;
        let mut rejected = 0;

        for raw in records {
            let draft = match normalize(raw, ctx) {
                Ok(draft) => draft,
                Err(reason) => {
                    rejected += 1;
                    debug!(%reason, "skipping unusable record");
                    continue;
                }
            };

            match self.creation.create(draft, EventOrigin::Scraper).await {
                Ok(outcome) => {
                    if outcome.duplicate {
                        debug!(event = %outcome.event.id, "record already present");
                    }
                    processed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "failed to persist record");
                }
            }
        }

        if rejected > 0 {
            info!(rejected, "records rejected during normalization");
        }
        processed
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use gather_domain::{RawTime, ScrapeStrategy, SelectorSet, SourceRunState, SourceSchedule};

    use super::*;
    use crate::ports::{EventRepository, EventSourceAdapter};
    use crate::testutil::{InMemoryCalendarRepository, InMemoryEventRepository, InMemorySourceRepository};

    struct StubAdapter {
        kind: &'static str,
        response: Result<Vec<RawEventRecord>>,
    }

    #[async_trait]
    impl EventSourceAdapter for StubAdapter {
        fn kind(&self) -> &'static str {
            self.kind
        }

        async fn fetch(&self, _target: &IngestTarget) -> Result<Vec<RawEventRecord>> {
            self.response.clone()
        }
    }

    struct Harness {
        events: Arc<InMemoryEventRepository>,
        sources: Arc<InMemorySourceRepository>,
        calendars: Arc<InMemoryCalendarRepository>,
    }

    fn coordinator(harness: &Harness, adapter: StubAdapter) -> IngestionCoordinator {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(adapter));
        let creation = Arc::new(EventCreationService::new(
            Arc::clone(&harness.events) as Arc<dyn EventRepository>,
            Arc::clone(&harness.calendars) as Arc<dyn CalendarRepository>,
            "system-user".to_string(),
        ));
        IngestionCoordinator::new(
            registry,
            creation,
            Arc::clone(&harness.sources) as Arc<dyn SourceRepository>,
            Arc::clone(&harness.calendars) as Arc<dyn CalendarRepository>,
        )
    }

    fn harness() -> Harness {
        Harness {
            events: Arc::new(InMemoryEventRepository::default()),
            sources: Arc::new(InMemorySourceRepository::default()),
            calendars: Arc::new(InMemoryCalendarRepository::default()),
        }
    }

    fn descriptor(id: &str) -> SourceDescriptor {
        SourceDescriptor {
            id: id.into(),
            name: "Do512".into(),
            slug: "do512".into(),
            calendar_id: None,
            base_url: "https://do512.com".into(),
            list_path: "/events".into(),
            enabled: true,
            strategy: ScrapeStrategy::Selectors { selectors: SelectorSet::default() },
            schedule: SourceSchedule::default(),
            run_state: SourceRunState::default(),
        }
    }

    fn record(title: &str) -> RawEventRecord {
        RawEventRecord {
            title: Some(title.into()),
            start: Some(RawTime::Text("2026-06-05T19:00:00Z".into())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn successful_run_updates_all_bookkeeping() {
        let h = harness();
        h.sources.insert_source(&descriptor("src-1")).await.unwrap();

        let mut untitled = record("x");
        untitled.title = None;
        let adapter = StubAdapter {
            kind: "scrape",
            response: Ok(vec![record("Jazz Night"), record("Trivia Night"), untitled]),
        };

        let outcome = coordinator(&h, adapter).run_source("src-1").await.unwrap();
        assert!(outcome.success);
        // Two usable records; the untitled one was rejected, not fatal
        assert_eq!(outcome.count, 2);

        let source = h.sources.get_source("src-1").await.unwrap();
        assert!(source.run_state.last_run_at.is_some());
        assert!(source.run_state.last_success_at.is_some());
        assert_eq!(source.run_state.last_run_count, 2);
        assert_eq!(source.run_state.total_events, 2);
        assert!(source.run_state.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_run_records_last_run_but_not_last_success() {
        let h = harness();
        h.sources.insert_source(&descriptor("src-1")).await.unwrap();

        let adapter = StubAdapter {
            kind: "scrape",
            response: Err(GatherError::Network("listing fetch timed out".into())),
        };

        let result = coordinator(&h, adapter).run_source("src-1").await;
        assert!(result.is_err());

        let source = h.sources.get_source("src-1").await.unwrap();
        assert!(source.run_state.last_run_at.is_some());
        assert!(source.run_state.last_success_at.is_none());
        assert_eq!(source.run_state.last_error.as_deref(), Some("Network error: listing fetch timed out"));
    }

    #[tokio::test]
    async fn deleted_source_is_not_found() {
        let h = harness();
        let adapter = StubAdapter { kind: "scrape", response: Ok(vec![]) };
        let result = coordinator(&h, adapter).run_source("gone").await;
        assert!(matches!(result, Err(GatherError::NotFound(_))));
    }

    #[tokio::test]
    async fn reimport_produces_no_new_events() {
        let h = harness();
        h.sources.insert_source(&descriptor("src-1")).await.unwrap();

        let records = vec![record("Jazz Night"), record("Trivia Night")];
        let first = coordinator(
            &h,
            StubAdapter { kind: "scrape", response: Ok(records.clone()) },
        );
        first.run_source("src-1").await.unwrap();

        let day = chrono::NaiveDate::from_ymd_opt(2026, 6, 5).unwrap();
        let after_first = h.events.find_by_day(day).await.unwrap().len();
        assert_eq!(after_first, 2);

        let second =
            coordinator(&h, StubAdapter { kind: "scrape", response: Ok(records) });
        let outcome = second.run_source("src-1").await.unwrap();
        // All duplicates: processed but nothing new
        assert_eq!(outcome.count, 2);
        assert_eq!(h.events.find_by_day(day).await.unwrap().len(), after_first);
    }

    fn extract_calendar(id: &str) -> CalendarImport {
        CalendarImport {
            id: id.into(),
            owner_id: "user-1".into(),
            name: "Weekend Finds".into(),
            import_kind: Some(ImportKind::Extract),
            import_url: Some("https://visitaustin.example/events".into()),
            import_source_id: None,
            import_enabled: true,
            sync_interval_hours: 24,
            last_imported_at: None,
            import_error: None,
            extraction_prompt: Some("family events this weekend".into()),
            extraction_status: Some(ExtractionStatus::Pending),
            ical_token: None,
        }
    }

    #[tokio::test]
    async fn extraction_success_transitions_to_completed() {
        let h = harness();
        h.calendars.insert_calendar(&extract_calendar("cal-x")).await.unwrap();

        let adapter =
            StubAdapter { kind: "extract", response: Ok(vec![record("Kite Festival")]) };
        let outcome = coordinator(&h, adapter).run_calendar("cal-x").await.unwrap();
        assert_eq!(outcome.count, 1);

        let calendar = h.calendars.get_calendar("cal-x").await.unwrap();
        assert_eq!(calendar.extraction_status, Some(ExtractionStatus::Completed));
        assert!(calendar.last_imported_at.is_some());
        assert!(calendar.import_error.is_none());
    }

    #[tokio::test]
    async fn extraction_failure_transitions_to_failed_with_error() {
        let h = harness();
        h.calendars.insert_calendar(&extract_calendar("cal-x")).await.unwrap();

        let adapter = StubAdapter {
            kind: "extract",
            response: Err(GatherError::Network("extraction endpoint unreachable".into())),
        };
        let result = coordinator(&h, adapter).run_calendar("cal-x").await;
        assert!(result.is_err());

        let calendar = h.calendars.get_calendar("cal-x").await.unwrap();
        assert_eq!(calendar.extraction_status, Some(ExtractionStatus::Failed));
        assert!(calendar.import_error.is_some());
        assert!(calendar.last_imported_at.is_none());
    }

    #[tokio::test]
    async fn enabled_calendar_without_location_is_a_config_error() {
        let h = harness();
        let mut calendar = extract_calendar("cal-x");
        calendar.import_url = None;
        h.calendars.insert_calendar(&calendar).await.unwrap();

        let adapter = StubAdapter { kind: "extract", response: Ok(vec![]) };
        let result = coordinator(&h, adapter).run_calendar("cal-x").await;
        assert!(matches!(result, Err(GatherError::Config(_))));

        let calendar = h.calendars.get_calendar("cal-x").await.unwrap();
        assert!(calendar.import_error.is_some());
    }
}
