//! Source descriptors: persisted configuration + run state for one external
//! event source.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::DEFAULT_SOURCE_INTERVAL_HOURS;

/// How a source is scraped: a named custom adapter registered in code, or
/// the generic configurable scraper driven by CSS selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum ScrapeStrategy {
    Custom { adapter: String },
    Selectors { selectors: SelectorSet },
}

/// Named CSS selectors for the configurable scraper. Every accessor falls
/// back to a sensible default so partially-configured sources still work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub event_links: Option<String>,
    pub event_link_pattern: Option<String>,
    pub title: Option<String>,
    pub datetime: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl SelectorSet {
    #[must_use]
    pub fn event_links(&self) -> &str {
        self.event_links.as_deref().unwrap_or(r#"a[href*="/event"]"#)
    }

    #[must_use]
    pub fn event_link_pattern(&self) -> &str {
        self.event_link_pattern.as_deref().unwrap_or("/events?/")
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("h1")
    }

    #[must_use]
    pub fn datetime(&self) -> &str {
        self.datetime.as_deref().unwrap_or("[datetime], time[datetime], .date, .time")
    }

    #[must_use]
    pub fn venue(&self) -> &str {
        self.venue.as_deref().unwrap_or(r#".venue, [itemprop="location"]"#)
    }

    #[must_use]
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or(r#".address, [itemprop="address"]"#)
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(r#".description, [itemprop="description"], p"#)
    }

    #[must_use]
    pub fn image(&self) -> &str {
        self.image
            .as_deref()
            .unwrap_or(r#"meta[property="og:image"], img.event-image, .event-img img"#)
    }
}

/// Schedule configuration for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchedule {
    pub interval_hours: u32,
    pub cron: Option<String>,
}

impl Default for SourceSchedule {
    fn default() -> Self {
        Self { interval_hours: DEFAULT_SOURCE_INTERVAL_HOURS, cron: None }
    }
}

/// Run bookkeeping, updated after every run (failed runs included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRunState {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_run_count: i64,
    pub total_events: i64,
    pub last_error: Option<String>,
}

/// Persisted configuration + run state for one external event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    /// Uniqueness key, scoped to the owning calendar (global when unowned).
    pub slug: String,
    pub calendar_id: Option<String>,
    pub base_url: String,
    pub list_path: String,
    pub enabled: bool,
    pub strategy: ScrapeStrategy,
    pub schedule: SourceSchedule,
    pub run_state: SourceRunState,
}

impl SourceDescriptor {
    /// Resolve a possibly-relative path against the source's base URL.
    #[must_use]
    pub fn full_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        match Url::parse(&self.base_url).and_then(|base| base.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => path.to_string(),
        }
    }

    /// URL of the listing page.
    #[must_use]
    pub fn list_url(&self) -> String {
        self.full_url(&self.list_path)
    }

    /// Whether this source is due for a run: never run, or last run older
    /// than the configured interval.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.run_state.last_run_at {
            None => true,
            Some(last) => now - last >= Duration::hours(i64::from(self.schedule.interval_hours)),
        }
    }
}
