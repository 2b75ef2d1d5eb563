//! iCal feed export
//!
//! Produces a standard calendar-interchange document for a calendar's
//! events, addressed by the calendar's rotating token. UIDs are stable and
//! derived from the internal event id; all-day events serialize as DATE
//! values, timed ones as UTC DATE-TIME.

use gather_domain::{CalendarImport, Event};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};

/// Build the interchange document for one calendar.
#[must_use]
pub fn export_feed(calendar: &CalendarImport, events: &[Event]) -> String {
    let mut feed = Calendar::new();
    feed.name(&calendar.name);

    for event in events {
        let mut component = IcalEvent::new();
        component.uid(&format!("event-{}@gather", event.id));
        component.summary(&event.title);

        if event.all_day {
            component.starts(event.starts_at.date_naive());
            component.ends(event.effective_end().date_naive());
        } else {
            component.starts(event.starts_at);
            component.ends(event.effective_end());
        }

        if let Some(description) = event.description.as_deref() {
            component.description(description);
        }

        let place = [event.venue.as_deref(), event.location.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if !place.is_empty() {
            component.location(&place);
        }

        if let Some(url) = event.source_url.as_deref() {
            component.add_property("URL", url);
        }
        let category = event.event_type.as_str().to_uppercase();
        component.add_property("CATEGORIES", category.as_str());

        feed.push(component.done());
    }

    feed.done().to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use gather_domain::EventType;

    use super::*;

    fn calendar() -> CalendarImport {
        CalendarImport {
            id: "cal-1".into(),
            owner_id: "user-1".into(),
            name: "Community Events".into(),
            import_kind: None,
            import_url: None,
            import_source_id: None,
            import_enabled: false,
            sync_interval_hours: 24,
            last_imported_at: None,
            import_error: None,
            extraction_prompt: None,
            extraction_status: None,
            ical_token: Some("tok-abc".into()),
        }
    }

    fn event(id: &str, title: &str, all_day: bool) -> Event {
        let starts_at = Utc.with_ymd_and_hms(2026, 6, 6, 19, 0, 0).unwrap();
        Event {
            id: id.into(),
            title: title.into(),
            starts_at,
            ends_at: Some(starts_at + Duration::hours(2)),
            all_day,
            location: Some("801 Red River St".into()),
            venue: Some("Stubbs".into()),
            description: Some("Outdoor show".into()),
            event_type: EventType::Celebration,
            image_url: None,
            source_name: None,
            source_id: None,
            source_url: Some("https://example.com/events/jazz".into()),
            calendar_id: Some("cal-1".into()),
            post_id: None,
            created_at: starts_at,
            updated_at: starts_at,
        }
    }

    #[test]
    fn feed_contains_one_component_per_event() {
        let feed = export_feed(&calendar(), &[event("e1", "Jazz Night", false), event("e2", "Fair", true)]);
        assert_eq!(feed.matches("BEGIN:VEVENT").count(), 2);
        assert!(feed.contains("UID:event-e1@gather"));
        assert!(feed.contains("UID:event-e2@gather"));
    }

    #[test]
    fn all_day_events_use_date_values() {
        let feed = export_feed(&calendar(), &[event("e1", "Fair", true)]);
        assert!(feed.contains("DTSTART;VALUE=DATE:20260606"), "{feed}");
    }

    #[test]
    fn timed_events_use_utc_datetimes() {
        let feed = export_feed(&calendar(), &[event("e1", "Jazz Night", false)]);
        assert!(feed.contains("DTSTART:20260606T190000Z"), "{feed}");
        assert!(feed.contains("DTEND:20260606T210000Z"), "{feed}");
    }

    #[test]
    fn categories_and_location_are_populated() {
        let feed = export_feed(&calendar(), &[event("e1", "Jazz Night", false)]);
        assert!(feed.contains("CATEGORIES:CELEBRATION"));
        assert!(feed.contains("Stubbs"));
        assert!(feed.contains("801 Red River St"));
    }
}
