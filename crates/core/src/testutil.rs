//! In-memory port implementations shared by unit tests.
//!
//! These mirror the store semantics the real repositories provide: the
//! ownership invariant, the partial uniqueness constraint on
//! (source_name, source_id), and day-bucket queries.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gather_domain::types::event::validate_ownership;
use gather_domain::{
    CalendarImport, Event, EventDraft, EventType, ExtractionStatus, GatherError, Result,
    SourceDescriptor, SourceRunState,
};
use uuid::Uuid;

use crate::ports::{CalendarRepository, EventRepository, SourceRepository};

/// Draft starting at the given hour (UTC), owned by a fixed calendar.
pub fn draft(title: &str, year: i32, month: u32, day: u32, hour: u32) -> EventDraft {
    EventDraft {
        title: title.into(),
        starts_at: Some(Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()),
        calendar_id: Some("cal-1".into()),
        ..Default::default()
    }
}

/// Persisted event on the given day, for direct pair comparisons.
pub fn event_on(title: &str, venue: Option<&str>, year: i32, month: u32, day: u32) -> Event {
    let starts_at = Utc.with_ymd_and_hms(year, month, day, 19, 0, 0).unwrap();
    Event {
        id: Uuid::now_v7().to_string(),
        title: title.into(),
        starts_at,
        ends_at: None,
        all_day: false,
        location: None,
        venue: venue.map(Into::into),
        description: None,
        event_type: EventType::Social,
        image_url: None,
        source_name: None,
        source_id: None,
        source_url: None,
        calendar_id: Some("cal-1".into()),
        post_id: None,
        created_at: starts_at,
        updated_at: starts_at,
    }
}

#[derive(Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert_event(&self, draft: &EventDraft) -> Result<Event> {
        if draft.title.trim().is_empty() {
            return Err(GatherError::InvalidInput("title is required".into()));
        }
        let starts_at = draft
            .starts_at
            .ok_or_else(|| GatherError::InvalidInput("start time is required".into()))?;
        validate_ownership(draft.calendar_id.as_deref(), draft.post_id.as_deref())?;

        let mut events = self.events.lock().unwrap();
        if draft.has_source_ref()
            && events.iter().any(|e| {
                e.source_name == draft.source_name && e.source_id == draft.source_id
            })
        {
            return Err(GatherError::Database("unique constraint violation".into()));
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::now_v7().to_string(),
            title: draft.title.clone(),
            starts_at,
            ends_at: draft.ends_at,
            all_day: draft.all_day,
            location: draft.location.clone(),
            venue: draft.venue.clone(),
            description: draft.description.clone(),
            event_type: draft.event_type,
            image_url: draft.image_url.clone(),
            source_name: draft.source_name.clone(),
            source_id: draft.source_id.clone(),
            source_url: draft.source_url.clone(),
            calendar_id: draft.calendar_id.clone(),
            post_id: draft.post_id.clone(),
            created_at: now,
            updated_at: now,
        };
        events.push(event.clone());
        Ok(event)
    }

    async fn find_by_source_ref(
        &self,
        source_name: &str,
        source_id: &str,
    ) -> Result<Option<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.source_name.as_deref() == Some(source_name)
                    && e.source_id.as_deref() == Some(source_id)
            })
            .cloned())
    }

    async fn find_by_day(&self, day: NaiveDate) -> Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.start_date() == day)
            .cloned()
            .collect())
    }

    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let mut matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_at >= start && e.starts_at <= end)
            .cloned()
            .collect();
        matches.sort_by_key(|e| e.starts_at);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Event>> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || e.venue.as_deref().is_some_and(|v| v.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by_key(|e| e.starts_at);
        matches.truncate(limit);
        Ok(matches)
    }

    async fn find_source_attributed(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.source_name.is_some() && e.start_date() >= from && e.start_date() <= to
            })
            .cloned()
            .collect())
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(GatherError::NotFound(format!("event not found: {id}")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySourceRepository {
    pub sources: Mutex<HashMap<String, SourceDescriptor>>,
}

#[async_trait]
impl SourceRepository for InMemorySourceRepository {
    async fn get_source(&self, id: &str) -> Result<SourceDescriptor> {
        self.sources
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GatherError::NotFound(format!("source not found: {id}")))
    }

    async fn list_enabled(&self) -> Result<Vec<SourceDescriptor>> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn update_run_state(&self, id: &str, run_state: &SourceRunState) -> Result<()> {
        let mut sources = self.sources.lock().unwrap();
        let source = sources
            .get_mut(id)
            .ok_or_else(|| GatherError::NotFound(format!("source not found: {id}")))?;
        source.run_state = run_state.clone();
        Ok(())
    }

    async fn insert_source(&self, descriptor: &SourceDescriptor) -> Result<()> {
        self.sources
            .lock()
            .unwrap()
            .insert(descriptor.id.clone(), descriptor.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCalendarRepository {
    pub calendars: Mutex<HashMap<String, CalendarImport>>,
}

#[async_trait]
impl CalendarRepository for InMemoryCalendarRepository {
    async fn get_calendar(&self, id: &str) -> Result<CalendarImport> {
        self.calendars
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GatherError::NotFound(format!("calendar not found: {id}")))
    }

    async fn find_by_ical_token(&self, token: &str) -> Result<Option<CalendarImport>> {
        Ok(self
            .calendars
            .lock()
            .unwrap()
            .values()
            .find(|c| c.ical_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_import_enabled(&self) -> Result<Vec<CalendarImport>> {
        Ok(self
            .calendars
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.import_enabled)
            .cloned()
            .collect())
    }

    async fn update_import_outcome(
        &self,
        id: &str,
        last_imported_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut calendars = self.calendars.lock().unwrap();
        let calendar = calendars
            .get_mut(id)
            .ok_or_else(|| GatherError::NotFound(format!("calendar not found: {id}")))?;
        if let Some(imported) = last_imported_at {
            calendar.last_imported_at = Some(imported);
        }
        calendar.import_error = error.map(Into::into);
        Ok(())
    }

    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut calendars = self.calendars.lock().unwrap();
        let calendar = calendars
            .get_mut(id)
            .ok_or_else(|| GatherError::NotFound(format!("calendar not found: {id}")))?;
        calendar.extraction_status = Some(status);
        if error.is_some() {
            calendar.import_error = error.map(Into::into);
        }
        Ok(())
    }

    async fn insert_calendar(&self, calendar: &CalendarImport) -> Result<()> {
        self.calendars
            .lock()
            .unwrap()
            .insert(calendar.id.clone(), calendar.clone());
        Ok(())
    }

    async fn find_or_create_owned(&self, owner_id: &str, name: &str) -> Result<CalendarImport> {
        let mut calendars = self.calendars.lock().unwrap();
        if let Some(existing) = calendars
            .values()
            .find(|c| c.owner_id == owner_id && c.name == name)
        {
            return Ok(existing.clone());
        }
        let calendar = CalendarImport {
            id: Uuid::now_v7().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            import_kind: None,
            import_url: None,
            import_source_id: None,
            import_enabled: false,
            sync_interval_hours: 0,
            last_imported_at: None,
            import_error: None,
            extraction_prompt: None,
            extraction_status: None,
            ical_token: None,
        };
        calendars.insert(calendar.id.clone(), calendar.clone());
        Ok(calendar)
    }
}
