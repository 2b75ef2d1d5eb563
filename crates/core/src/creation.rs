//! Unified event creation
//!
//! Single entry point for all producers: manual UI, public API, scrapers,
//! and the chat assistant. Deduplication applies only to scraper-origin
//! creations and anything carrying a source name; manual/api/chat writes
//! skip it.

use std::sync::Arc;

use chrono::NaiveDate;
use gather_domain::constants::DERIVED_SOURCE_ID_LEN;
use gather_domain::{Event, EventDraft, EventOrigin, GatherError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::dedup::DedupEngine;
use crate::ports::{CalendarRepository, EventRepository};

/// Result of an event-creation call.
#[derive(Debug, Clone)]
pub struct CreationOutcome {
    pub event: Event,
    /// True when an existing event was returned instead of creating one.
    pub duplicate: bool,
}

/// Service behind every event-creation entry point.
pub struct EventCreationService {
    events: Arc<dyn EventRepository>,
    calendars: Arc<dyn CalendarRepository>,
    dedup: DedupEngine,
    /// Designated owner for scraper-created calendars (injected, not looked
    /// up per call).
    system_owner: String,
}

impl EventCreationService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        calendars: Arc<dyn CalendarRepository>,
        system_owner: String,
    ) -> Self {
        let dedup = DedupEngine::new(Arc::clone(&events));
        Self { events, calendars, dedup, system_owner }
    }

    /// Create an event from a draft.
    ///
    /// Scraped drafts without an upstream id are keyed by a derived hash of
    /// (title, start date) so re-imports hit the authoritative dedup path;
    /// scraped drafts without an owner land on a system-owned calendar named
    /// after the source.
    ///
    /// # Errors
    /// `InvalidInput` for missing title/start or missing owning context;
    /// storage errors otherwise. A lost insert race on the source-attribution
    /// uniqueness constraint is resolved as a duplicate, not an error.
    #[instrument(skip(self, draft), fields(origin = origin.as_str(), title = %draft.title))]
    pub async fn create(&self, mut draft: EventDraft, origin: EventOrigin) -> Result<CreationOutcome> {
        if draft.title.trim().is_empty() {
            return Err(GatherError::InvalidInput("title is required".into()));
        }
        if draft.starts_at.is_none() {
            return Err(GatherError::InvalidInput("start time is required".into()));
        }

        if origin == EventOrigin::Scraper {
            self.prepare_scraped(&mut draft).await?;
        }

        if should_check_duplicates(&draft, origin) {
            if let Some(existing) = self.dedup.find_duplicate(&draft).await? {
                debug!(existing = %existing.id, "duplicate detected, returning existing event");
                return Ok(CreationOutcome { event: existing, duplicate: true });
            }
        }

        match self.events.insert_event(&draft).await {
            Ok(event) => Ok(CreationOutcome { event, duplicate: false }),
            // A racing writer can land the same (source_name, source_id)
            // between our dedup check and the insert. The store's uniqueness
            // constraint is the arbiter; the loser resolves to duplicate-skip.
            Err(GatherError::Database(message))
                if message.contains("unique constraint") && draft.has_source_ref() =>
            {
                let name = draft.source_name.as_deref().unwrap_or_default();
                let id = draft.source_id.as_deref().unwrap_or_default();
                match self.events.find_by_source_ref(name, id).await? {
                    Some(existing) => {
                        debug!(existing = %existing.id, "insert lost source-ref race");
                        Ok(CreationOutcome { event: existing, duplicate: true })
                    }
                    None => Err(GatherError::Database(message)),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn prepare_scraped(&self, draft: &mut EventDraft) -> Result<()> {
        if draft.source_id.as_deref().map_or(true, str::is_empty) {
            if let Some(starts_at) = draft.starts_at {
                draft.source_id =
                    Some(derived_source_id(&draft.title, starts_at.date_naive()));
            }
        }

        if draft.calendar_id.is_none() && draft.post_id.is_none() {
            let name = draft
                .source_name
                .clone()
                .unwrap_or_else(|| "Scraped Events".to_string());
            let calendar = self.calendars.find_or_create_owned(&self.system_owner, &name).await?;
            draft.calendar_id = Some(calendar.id);
        }
        Ok(())
    }
}

fn should_check_duplicates(draft: &EventDraft, origin: EventOrigin) -> bool {
    origin == EventOrigin::Scraper
        || draft.source_name.as_deref().is_some_and(|s| !s.is_empty())
}

/// Stable id for scraped records with no upstream identifier:
/// sha-256 over the slugged title + start date, truncated.
#[must_use]
pub fn derived_source_id(title: &str, date: NaiveDate) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");

    let mut hasher = Sha256::new();
    hasher.update(slug.as_bytes());
    hasher.update(b"-");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..DERIVED_SOURCE_ID_LEN].to_string()
}
