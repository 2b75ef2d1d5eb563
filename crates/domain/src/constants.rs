//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! ingestion pipeline.

// Field caps applied at normalization/persistence time
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_VENUE_LENGTH: usize = 255;
pub const MAX_LOCATION_LENGTH: usize = 500;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_SCRAPED_DESCRIPTION_LENGTH: usize = 1000;

// Import windows
pub const ICAL_BACKFILL_DAYS: i64 = 30;
pub const GOOGLE_LOOKBACK_DAYS: i64 = 30;
pub const GOOGLE_LOOKAHEAD_DAYS: i64 = 365;
pub const GOOGLE_PAGE_SIZE: u32 = 250;
pub const DEFAULT_EXTRACT_WINDOW_DAYS: i64 = 8;

// Scraper limits
pub const MAX_DETAIL_LINKS: usize = 50;
pub const DETAIL_FETCH_DELAY_MIN_MS: u64 = 500;
pub const DETAIL_FETCH_DELAY_MAX_MS: u64 = 1500;

// Deduplication thresholds
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const VENUE_TITLE_SIMILARITY_THRESHOLD: f64 = 0.60;
pub const LONG_DESCRIPTION_THRESHOLD: usize = 100;

// Scheduling defaults
pub const DEFAULT_SOURCE_INTERVAL_HOURS: u32 = 4;
pub const DEFAULT_EVENT_DURATION_SECS: i64 = 3600;

// Derived source ids for scraped records with no upstream id
pub const DERIVED_SOURCE_ID_LEN: usize = 13;
