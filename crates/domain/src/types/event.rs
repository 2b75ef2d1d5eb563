//! Canonical event model
//!
//! Every source adapter converges on [`EventDraft`]; persisted records are
//! [`Event`]. Ownership is exclusive: an event belongs to a calendar or to a
//! post, never neither.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EVENT_DURATION_SECS, LONG_DESCRIPTION_THRESHOLD};
use crate::errors::{GatherError, Result};

/// Closed set of event categories. Unrecognized upstream values map to
/// [`EventType::Social`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    Social,
    Meeting,
    Workshop,
    Community,
    Celebration,
}

impl EventType {
    /// Lenient mapping from upstream text; anything unknown becomes `Social`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "meeting" => Self::Meeting,
            "workshop" => Self::Workshop,
            "community" => Self::Community,
            "celebration" => Self::Celebration,
            _ => Self::Social,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Meeting => "meeting",
            Self::Workshop => "workshop",
            Self::Community => "community",
            Self::Celebration => "celebration",
        }
    }
}

/// Origin tag for an event-creation call. Controls whether deduplication is
/// applied: scraper-origin creations (and anything carrying a source name)
/// are dedup-checked, manual/api/chat creations are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    Manual,
    Api,
    Scraper,
    Chat,
}

impl EventOrigin {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Api => "api",
            Self::Scraper => "scraper",
            Self::Chat => "chat",
        }
    }
}

/// Normalized event draft, ready for dedup + persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub event_type: EventType,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub calendar_id: Option<String>,
    pub post_id: Option<String>,
}

impl EventDraft {
    /// Calendar day of the draft's start time, when set.
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.starts_at.map(|dt| dt.date_naive())
    }

    /// True when both halves of the authoritative dedup key are present.
    #[must_use]
    pub fn has_source_ref(&self) -> bool {
        self.source_name.as_deref().is_some_and(|s| !s.is_empty())
            && self.source_id.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Persisted canonical event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub event_type: EventType,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub calendar_id: Option<String>,
    pub post_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// End of the event's occupancy range: `ends_at`, defaulting to one hour
    /// after the start.
    #[must_use]
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.ends_at
            .unwrap_or_else(|| self.starts_at + Duration::seconds(DEFAULT_EVENT_DURATION_SECS))
    }

    /// Calendar day of the start time.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.starts_at.date_naive()
    }

    /// Validate the exclusive-ownership invariant.
    ///
    /// # Errors
    /// Returns `InvalidInput` when neither a calendar nor a post owns the
    /// event.
    pub fn validate_ownership(&self) -> Result<()> {
        validate_ownership(self.calendar_id.as_deref(), self.post_id.as_deref())
    }

    /// Heuristic used to pick which of two detected duplicates to keep.
    ///
    /// One point each for a populated title, description, venue, location,
    /// image, and source URL, plus two extra points for a substantive
    /// description.
    #[must_use]
    pub fn completeness_score(&self) -> u32 {
        let mut score = 0;
        if !self.title.trim().is_empty() {
            score += 1;
        }
        if let Some(desc) = self.description.as_deref() {
            if !desc.trim().is_empty() {
                score += 1;
            }
            if desc.len() > LONG_DESCRIPTION_THRESHOLD {
                score += 2;
            }
        }
        if self.venue.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            score += 1;
        }
        if self.location.as_deref().is_some_and(|l| !l.trim().is_empty()) {
            score += 1;
        }
        if self.image_url.as_deref().is_some_and(|u| !u.is_empty()) {
            score += 1;
        }
        if self.source_url.as_deref().is_some_and(|u| !u.is_empty()) {
            score += 1;
        }
        score
    }
}

/// Shared write-time check for the calendar-or-post invariant.
pub fn validate_ownership(calendar_id: Option<&str>, post_id: Option<&str>) -> Result<()> {
    let has_calendar = calendar_id.is_some_and(|id| !id.is_empty());
    let has_post = post_id.is_some_and(|id| !id.is_empty());
    if has_calendar || has_post {
        Ok(())
    } else {
        Err(GatherError::InvalidInput(
            "event must belong to either a calendar or a post".into(),
        ))
    }
}
