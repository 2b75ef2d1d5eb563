//! External source integrations
//!
//! One module per adapter kind:
//! - `ical`: RFC 5545 feed import + the token-addressed feed export
//! - `google`: Google Calendar API import with token refresh
//! - `scrape`: configurable CSS-selector scraper + custom scraper registry
//! - `extract`: AI page-extraction API

pub mod extract;
pub mod google;
pub mod ical;
pub mod scrape;

pub use extract::{ExtractAdapter, ExtractClient};
pub use google::{AccessTokenProvider, GoogleCalendarAdapter, OAuthTokenProvider};
pub use ical::{export_feed, IcalAdapter};
pub use scrape::{CustomScraper, CustomScraperRegistry, ScrapeAdapter};
