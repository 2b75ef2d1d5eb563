//! Google Calendar integration

pub mod adapter;
pub mod tokens;

pub use adapter::GoogleCalendarAdapter;
pub use tokens::{AccessTokenProvider, OAuthTokenProvider, StaticTokenProvider};
