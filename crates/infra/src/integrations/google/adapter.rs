//! Google Calendar adapter
//!
//! Pages through the events list API inside a bounded window (30 days back,
//! one year ahead). The access token is renewed first when expired; an
//! authorization failure surfaces as a distinct `Auth` error ("needs
//! reconnect") that the retry layer treats as terminal, unlike transient
//! network failures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use gather_core::coordinator::IngestTarget;
use gather_core::ports::EventSourceAdapter;
use gather_domain::constants::{GOOGLE_LOOKAHEAD_DAYS, GOOGLE_LOOKBACK_DAYS, GOOGLE_PAGE_SIZE};
use gather_domain::{GatherError, RawEventRecord, RawTime, Result};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::tokens::AccessTokenProvider;
use crate::errors::InfraError;
use crate::http::HttpClient;

pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar adapter.
pub struct GoogleCalendarAdapter {
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    api_base: String,
}

impl GoogleCalendarAdapter {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_api_base(http, tokens, GOOGLE_CALENDAR_API_BASE)
    }

    /// Override the API base URL (tests).
    pub fn with_api_base(
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
        api_base: &str,
    ) -> Self {
        Self { http, tokens, api_base: api_base.trim_end_matches('/').to_string() }
    }

    async fn fetch_page(
        &self,
        access_token: &str,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> Result<GoogleEventsResponse> {
        let now = Utc::now();
        let time_min = now - Duration::days(GOOGLE_LOOKBACK_DAYS);
        let time_max = now + Duration::days(GOOGLE_LOOKAHEAD_DAYS);

        let url = format!("{}/calendars/{}/events", self.api_base, calendar_id);
        let mut query: Vec<(&str, String)> = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("maxResults", GOOGLE_PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let request = self.http.get(&url).bearer_auth(access_token).query(&query);
        let response = self.http.send(request).await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatherError::Auth(
                "authorization expired; reconnect Google Calendar".into(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(GatherError::Network(format!("google api error ({status}): {body}")));
        }

        response.json().await.map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl EventSourceAdapter for GoogleCalendarAdapter {
    fn kind(&self) -> &'static str {
        "google"
    }

    #[instrument(skip(self, target), fields(target_id = target.id()))]
    async fn fetch(&self, target: &IngestTarget) -> Result<Vec<RawEventRecord>> {
        let IngestTarget::Calendar(calendar) = target else {
            return Err(GatherError::InvalidInput(
                "google adapter requires a calendar target".into(),
            ));
        };
        let calendar_id = calendar
            .import_source_id
            .as_deref()
            .ok_or_else(|| GatherError::Config("no external calendar id configured".into()))?;

        // Refresh first when expired; Auth errors propagate as terminal.
        let access_token = self.tokens.access_token().await?;

        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(&access_token, calendar_id, page_token.as_deref())
                .await?;

            for item in page.items {
                let Some(start) = item.start.as_ref().and_then(convert_event_time) else {
                    continue;
                };
                records.push(RawEventRecord {
                    source_id: Some(item.id),
                    title: item.summary,
                    start: Some(start),
                    end: item.end.as_ref().and_then(convert_event_time),
                    location: item.location,
                    venue: None,
                    description: item.description,
                    event_type: None,
                    image_url: None,
                    source_url: item.html_link,
                });
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
            debug!(count = records.len(), "following next google events page");
        }

        debug!(count = records.len(), "fetched google calendar events");
        Ok(records)
    }
}

/// Date-only values (all-day) stay dates; dateTime strings defer parsing to
/// the normalizer.
fn convert_event_time(value: &GoogleEventDateTime) -> Option<RawTime> {
    if let Some(date) = value.date.as_deref() {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return Some(RawTime::Date(parsed));
        }
    }
    value.date_time.clone().map(RawTime::Text)
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleCalendarEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<GoogleEventDateTime>,
    end: Option<GoogleEventDateTime>,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}
