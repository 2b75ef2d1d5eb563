//! Raw record normalization
//!
//! Converts adapter output into canonical [`EventDraft`]s. The transform is
//! pure: every parsing failure is a typed rejection for the coordinator to
//! log and skip, never a batch-fatal error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gather_domain::constants::{
    MAX_DESCRIPTION_LENGTH, MAX_LOCATION_LENGTH, MAX_TITLE_LENGTH, MAX_VENUE_LENGTH,
};
use gather_domain::{EventDraft, EventType, RawEventRecord, RawTime};
use thiserror::Error;

/// Attribution + ownership context for one adapter run.
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    /// Source tag recorded on every event from this run.
    pub source_name: Option<String>,
    /// Fallback source URL when a record carries none (e.g. the feed URL).
    pub source_url: Option<String>,
    /// Owning calendar for imported events.
    pub calendar_id: Option<String>,
}

/// Why a raw record was rejected. Expected, per-record, non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("record has no title")]
    MissingTitle,

    #[error("record has no start time")]
    MissingStart,

    #[error("unparsable start time: {value}")]
    UnparsableStart { value: String },
}

/// Normalize one raw record into an event draft.
///
/// Title and a parseable start time are required; everything else is
/// best-effort. End times that fail to parse or precede the start are
/// dropped (persistence applies the one-hour default). Unknown event types
/// map to social. Text fields are trimmed and capped.
///
/// # Errors
/// Returns a [`RejectReason`] for records missing a title or usable start.
pub fn normalize(
    raw: &RawEventRecord,
    ctx: &SourceContext,
) -> std::result::Result<EventDraft, RejectReason> {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RejectReason::MissingTitle)?;

    let start_raw = raw.start.as_ref().ok_or(RejectReason::MissingStart)?;
    let (starts_at, start_is_date_only) = parse_time(start_raw)
        .ok_or_else(|| RejectReason::UnparsableStart { value: describe_time(start_raw) })?;

    // A bad or backwards end never rejects the record; the store defaults it.
    let ends_at = raw
        .end
        .as_ref()
        .and_then(parse_time)
        .map(|(dt, _)| dt)
        .filter(|end| *end >= starts_at);

    let event_type =
        raw.event_type.as_deref().map(EventType::from_label).unwrap_or_default();

    Ok(EventDraft {
        title: truncate_chars(title, MAX_TITLE_LENGTH),
        starts_at: Some(starts_at),
        ends_at,
        all_day: start_is_date_only,
        location: clean_capped(raw.location.as_deref(), MAX_LOCATION_LENGTH),
        venue: clean_capped(raw.venue.as_deref(), MAX_VENUE_LENGTH),
        description: clean_capped(raw.description.as_deref(), MAX_DESCRIPTION_LENGTH),
        event_type,
        image_url: clean(raw.image_url.as_deref()),
        source_name: ctx.source_name.clone(),
        source_id: clean(raw.source_id.as_deref()),
        source_url: clean(raw.source_url.as_deref()).or_else(|| ctx.source_url.clone()),
        calendar_id: ctx.calendar_id.clone(),
        post_id: None,
    })
}

/// Resolve a raw time value to an instant, flagging date-only values
/// (all-day semantics).
fn parse_time(raw: &RawTime) -> Option<(DateTime<Utc>, bool)> {
    match raw {
        RawTime::Instant(dt) => Some((*dt, false)),
        RawTime::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| (dt.and_utc(), true)),
        RawTime::Text(text) => parse_time_text(text),
    }
}

/// Parse ISO 8601 and the handful of adapter-specific text shapes that show
/// up in scraped pages and extraction payloads.
fn parse_time_text(text: &str) -> Option<(DateTime<Utc>, bool)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some((dt.with_timezone(&Utc), false));
    }

    const DATETIME_FORMATS: &[&str] =
        &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some((naive.and_utc(), false));
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| (dt.and_utc(), true));
        }
    }

    None
}

fn describe_time(raw: &RawTime) -> String {
    match raw {
        RawTime::Text(text) => text.clone(),
        RawTime::Date(date) => date.to_string(),
        RawTime::Instant(dt) => dt.to_rfc3339(),
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToString::to_string)
}

fn clean_capped(value: Option<&str>, cap: usize) -> Option<String> {
    clean(value).map(|v| truncate_chars(&v, cap))
}

fn truncate_chars(value: &str, cap: usize) -> String {
    if value.chars().count() <= cap {
        value.to_string()
    } else {
        value.chars().take(cap).collect()
    }
}
