//! Raw event records produced by source adapters, before normalization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A start/end value as reported by a source.
///
/// Adapters that already resolve instants (Google, iCal) use the typed
/// variants; text-shaped sources (scraped pages, extraction payloads) defer
/// parsing to the normalizer. Date-only values carry all-day semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum RawTime {
    /// Date-only value (all-day semantics).
    Date(NaiveDate),
    /// Fully resolved instant.
    Instant(DateTime<Utc>),
    /// Unparsed source text, resolved by the normalizer.
    Text(String),
}

/// One event record as yielded by a source adapter.
///
/// Everything is optional: the normalizer decides which records are usable
/// and rejects the rest without failing the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEventRecord {
    /// Upstream identifier (iCal UID, Google event id). Absent for scraped
    /// pages without stable ids.
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub start: Option<RawTime>,
    pub end: Option<RawTime>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}
