//! Calendar import configuration.
//!
//! Only the import-relevant slice of a calendar is modeled here; rendering,
//! sharing, and social features live elsewhere.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Kind of external source a calendar imports from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Ical,
    Google,
    Apple,
    /// AI-driven page extraction.
    Extract,
}

impl ImportKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ical => "ical",
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Extract => "extract",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ical" => Some(Self::Ical),
            "google" => Some(Self::Google),
            "apple" => Some(Self::Apple),
            "extract" => Some(Self::Extract),
            _ => None,
        }
    }
}

/// Progress of an AI page-extraction run, observable by polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Import configuration + run state for one calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarImport {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub import_kind: Option<ImportKind>,
    /// Feed or page URL (iCal/Apple/extract kinds).
    pub import_url: Option<String>,
    /// External calendar id (Google kind).
    pub import_source_id: Option<String>,
    pub import_enabled: bool,
    pub sync_interval_hours: u32,
    pub last_imported_at: Option<DateTime<Utc>>,
    pub import_error: Option<String>,
    pub extraction_prompt: Option<String>,
    pub extraction_status: Option<ExtractionStatus>,
    /// Opaque rotating token addressing the exported iCal feed.
    pub ical_token: Option<String>,
}

impl CalendarImport {
    #[must_use]
    pub fn is_google(&self) -> bool {
        self.import_kind == Some(ImportKind::Google)
    }

    /// An import-enabled calendar must have a usable source location for its
    /// kind: an external id for Google, a URL otherwise.
    #[must_use]
    pub fn has_source_location(&self) -> bool {
        match self.import_kind {
            Some(ImportKind::Google) => {
                self.import_source_id.as_deref().is_some_and(|s| !s.is_empty())
            }
            Some(_) => self.import_url.as_deref().is_some_and(|s| !s.is_empty()),
            None => false,
        }
    }

    /// Whether this calendar is due for an import sync.
    #[must_use]
    pub fn needs_import_sync(&self, now: DateTime<Utc>) -> bool {
        if !self.import_enabled || !self.has_source_location() {
            return false;
        }
        match self.last_imported_at {
            None => true,
            Some(last) => now - last >= Duration::hours(i64::from(self.sync_interval_hours)),
        }
    }
}
