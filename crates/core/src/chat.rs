//! Chat assistant event tools
//!
//! The assistant's language-model side lives elsewhere; this module is the
//! tool contract it calls into: create, list, and search events. Results are
//! JSON payloads shaped for direct inclusion in a tool_result message.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use gather_domain::{EventOrigin, RawEventRecord, RawTime};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use crate::creation::EventCreationService;
use crate::normalize::{normalize, SourceContext};
use crate::ports::EventRepository;

const LIST_LIMIT: usize = 20;
const SEARCH_LIMIT: usize = 10;
const DEFAULT_LIST_DAYS: u64 = 7;

/// Event tools exposed to the chat assistant.
pub struct ChatTools {
    events: Arc<dyn EventRepository>,
    creation: Arc<EventCreationService>,
}

impl ChatTools {
    pub fn new(events: Arc<dyn EventRepository>, creation: Arc<EventCreationService>) -> Self {
        Self { events, creation }
    }

    /// Tool definitions in the shape the assistant API expects.
    #[must_use]
    pub fn definitions() -> Value {
        json!([
            {
                "name": "create_event",
                "description": "Create a calendar event for the user.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "starts_at": { "type": "string", "description": "ISO 8601 datetime" },
                        "ends_at": { "type": "string", "description": "ISO 8601 datetime" },
                        "location": { "type": "string" },
                        "description": { "type": "string" },
                        "all_day": { "type": "boolean" },
                        "event_type": {
                            "type": "string",
                            "enum": ["social", "meeting", "workshop", "community", "celebration"]
                        },
                        "calendar_id": { "type": "string" }
                    },
                    "required": ["title", "starts_at"]
                }
            },
            {
                "name": "list_events",
                "description": "List events in a date range (defaults to the next week).",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "start_date": { "type": "string", "description": "YYYY-MM-DD" },
                        "end_date": { "type": "string", "description": "YYYY-MM-DD" }
                    }
                }
            },
            {
                "name": "search_events",
                "description": "Search events by title, description, or venue.",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" }
                    },
                    "required": ["query"]
                }
            }
        ])
    }

    /// Dispatch one tool call by name.
    #[instrument(skip(self, input))]
    pub async fn execute(&self, name: &str, input: &Value) -> Value {
        match name {
            "create_event" => self.create_event(input).await,
            "list_events" => self.list_events(input).await,
            "search_events" => self.search_events(input).await,
            other => json!({ "type": "error", "message": format!("Unknown tool: {other}") }),
        }
    }

    async fn create_event(&self, input: &Value) -> Value {
        let raw = RawEventRecord {
            title: str_field(input, "title"),
            start: str_field(input, "starts_at")
                .or_else(|| str_field(input, "date"))
                .map(RawTime::Text),
            end: str_field(input, "ends_at").map(RawTime::Text),
            location: str_field(input, "location"),
            description: str_field(input, "description"),
            event_type: str_field(input, "event_type"),
            ..Default::default()
        };

        let mut draft = match normalize(&raw, &SourceContext::default()) {
            Ok(draft) => draft,
            Err(reason) => {
                return json!({ "type": "error", "message": reason.to_string() });
            }
        };
        draft.calendar_id = str_field(input, "calendar_id");
        if input.get("all_day").and_then(Value::as_bool) == Some(true) {
            draft.all_day = true;
        }

        match self.creation.create(draft, EventOrigin::Chat).await {
            Ok(outcome) => json!({
                "type": "event_created",
                "event": {
                    "id": outcome.event.id,
                    "title": outcome.event.title,
                    "starts_at": outcome.event.starts_at.to_rfc3339(),
                    "location": outcome.event.location,
                }
            }),
            Err(e) => {
                warn!(error = %e, "chat event creation failed");
                json!({ "type": "error", "message": e.to_string() })
            }
        }
    }

    async fn list_events(&self, input: &Value) -> Value {
        let today = Utc::now().date_naive();
        let start_date = date_field(input, "start_date").unwrap_or(today);
        let end_date = date_field(input, "end_date")
            .unwrap_or_else(|| start_date + Days::new(DEFAULT_LIST_DAYS));

        let (Some(start), Some(end)) = (
            start_date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            end_date.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc()),
        ) else {
            return json!({ "type": "error", "message": "invalid date range" });
        };

        match self.events.find_in_range(start, end, LIST_LIMIT).await {
            Ok(events) => {
                let message = if events.is_empty() {
                    "No events found in this date range.".to_string()
                } else {
                    format!("Found {} event(s).", events.len())
                };
                json!({
                    "type": "events_list",
                    "date_range": format!(
                        "{} to {}",
                        start_date.format("%B %d"),
                        end_date.format("%B %d, %Y")
                    ),
                    "count": events.len(),
                    "message": message,
                    "events": events.iter().map(summarize).collect::<Vec<_>>(),
                })
            }
            Err(e) => json!({ "type": "error", "message": e.to_string() }),
        }
    }

    async fn search_events(&self, input: &Value) -> Value {
        let Some(query) = str_field(input, "query") else {
            return json!({ "type": "error", "message": "query is required" });
        };

        match self.events.search(&query, SEARCH_LIMIT).await {
            Ok(events) => {
                let message = if events.is_empty() {
                    format!("No events found matching '{query}'.")
                } else {
                    format!("Found {} event(s) matching '{query}'.", events.len())
                };
                json!({
                    "type": "search_results",
                    "query": query,
                    "count": events.len(),
                    "message": message,
                    "events": events.iter().map(summarize).collect::<Vec<_>>(),
                })
            }
            Err(e) => json!({ "type": "error", "message": e.to_string() }),
        }
    }
}

fn summarize(event: &gather_domain::Event) -> Value {
    json!({
        "id": event.id,
        "title": event.title,
        "starts_at": event.starts_at.format("%A, %B %d at %l:%M %p").to_string(),
        "location": event.location,
    })
}

fn str_field(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn date_field(input: &Value, key: &str) -> Option<NaiveDate> {
    str_field(input, key).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use gather_domain::EventDraft;

    use super::*;
    use crate::ports::CalendarRepository;
    use crate::testutil::{draft, InMemoryCalendarRepository, InMemoryEventRepository};

    fn tools(events: &Arc<InMemoryEventRepository>) -> ChatTools {
        let calendars = Arc::new(InMemoryCalendarRepository::default());
        let creation = Arc::new(EventCreationService::new(
            Arc::clone(events) as Arc<dyn EventRepository>,
            calendars as Arc<dyn CalendarRepository>,
            "system-user".to_string(),
        ));
        ChatTools::new(Arc::clone(events) as Arc<dyn EventRepository>, creation)
    }

    async fn seed(events: &Arc<InMemoryEventRepository>, d: EventDraft) {
        events.insert_event(&d).await.unwrap();
    }

    #[tokio::test]
    async fn create_event_tool_round_trips() {
        let events = Arc::new(InMemoryEventRepository::default());
        let tools = tools(&events);

        let result = tools
            .execute(
                "create_event",
                &json!({
                    "title": "Board Game Night",
                    "starts_at": "2026-06-05T19:00:00Z",
                    "location": "Community Hall",
                    "calendar_id": "cal-1",
                }),
            )
            .await;

        assert_eq!(result["type"], "event_created");
        assert_eq!(result["event"]["title"], "Board Game Night");
        let day = NaiveDate::from_ymd_opt(2026, 6, 5).unwrap();
        assert_eq!(events.find_by_day(day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_event_tool_reports_missing_fields() {
        let events = Arc::new(InMemoryEventRepository::default());
        let tools = tools(&events);

        let result = tools
            .execute("create_event", &json!({ "starts_at": "2026-06-05T19:00:00Z" }))
            .await;
        assert_eq!(result["type"], "error");
    }

    #[tokio::test]
    async fn list_events_tool_respects_the_range() {
        let events = Arc::new(InMemoryEventRepository::default());
        seed(&events, draft("Inside", 2026, 6, 5, 19)).await;
        seed(&events, draft("Outside", 2026, 7, 5, 19)).await;
        let tools = tools(&events);

        let result = tools
            .execute(
                "list_events",
                &json!({ "start_date": "2026-06-01", "end_date": "2026-06-08" }),
            )
            .await;

        assert_eq!(result["type"], "events_list");
        assert_eq!(result["count"], 1);
        assert_eq!(result["events"][0]["title"], "Inside");
    }

    #[tokio::test]
    async fn search_events_tool_matches_venue() {
        let events = Arc::new(InMemoryEventRepository::default());
        let mut d = draft("Jazz Night", 2026, 6, 5, 19);
        d.venue = Some("The Elephant Room".into());
        seed(&events, d).await;
        let tools = tools(&events);

        let result = tools.execute("search_events", &json!({ "query": "elephant" })).await;
        assert_eq!(result["type"], "search_results");
        assert_eq!(result["count"], 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_payload() {
        let events = Arc::new(InMemoryEventRepository::default());
        let tools = tools(&events);
        let result = tools.execute("delete_everything", &json!({})).await;
        assert_eq!(result["type"], "error");
    }
}
