//! Extraction API client
//!
//! POSTs {url, extraction prompt, JSON schema describing the desired event
//! array} to the external extraction endpoint and maps the structured
//! response back into raw records. The free-text prompt's implied date range
//! is resolved deterministically before the request is built.

use std::time::Duration;

use chrono::NaiveDate;
use gather_domain::utils::date_range::{date_range_from_prompt, DateRange};
use gather_domain::{ExtractConfig, GatherError, RawEventRecord, RawTime, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Extraction API client.
pub struct ExtractClient {
    http: HttpClient,
    config: ExtractConfig,
}

impl ExtractClient {
    pub fn new(http: HttpClient, config: ExtractConfig) -> Self {
        Self { http, config }
    }

    /// Extract structured events from one page.
    ///
    /// # Errors
    /// `Config` when no API key is configured (terminal), `Auth` on rejected
    /// credentials, `Network` on transport/endpoint failures, and
    /// `InvalidInput` on malformed response bodies.
    #[instrument(skip(self, prompt), fields(url = page_url))]
    pub async fn extract_events(
        &self,
        page_url: &str,
        prompt: &str,
        today: NaiveDate,
    ) -> Result<Vec<RawEventRecord>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| GatherError::Config("extraction API key not configured".into()))?;

        let range = date_range_from_prompt(prompt, today);
        let body = json!({
            "url": page_url,
            "formats": ["extract"],
            "onlyMainContent": true,
            "extract": {
                "prompt": build_prompt(prompt, range, today),
                "schema": event_schema(),
            },
            "timeout": 30_000,
        });

        let request = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .timeout(Duration::from_secs(self.config.timeout_seconds));
        let response = self.http.send(request).await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(GatherError::Auth(format!("extraction API rejected credentials ({status})")));
        }
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(ToString::to_string))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(GatherError::Network(format!("extraction request failed: {message}")));
        }

        let payload: ExtractResponse = response.json().await.map_err(InfraError::from)?;
        if !payload.success {
            return Err(GatherError::Network(format!(
                "extraction failed: {}",
                payload.error.unwrap_or_else(|| "no error detail".into())
            )));
        }

        let events = payload
            .data
            .and_then(|d| d.extract)
            .map(|e| e.events)
            .unwrap_or_default();
        debug!(count = events.len(), "extraction returned events");

        Ok(events.into_iter().map(into_raw_record).collect())
    }
}

fn build_prompt(prompt: &str, range: DateRange, today: NaiveDate) -> String {
    format!(
        "Today is {}. Extract all events from this webpage that match: {}. \
         Only include events occurring between {} and {} (inclusive). \
         For each event, extract the title, start date/time in ISO 8601 format, \
         end date/time if available, location, venue name, a brief description \
         (1-2 sentences), and categorize as: social, meeting, workshop, \
         community, or celebration. If the year is not specified, assume {}. \
         Skip any events outside the date range.",
        today.format("%A, %B %-d, %Y"),
        prompt,
        range.from.format("%B %-d, %Y"),
        range.to.format("%B %-d, %Y"),
        today.format("%Y"),
    )
}

fn event_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "starts_at": { "type": "string", "description": "ISO 8601 datetime" },
                        "ends_at": { "type": "string", "description": "ISO 8601 datetime, if available" },
                        "location": { "type": "string" },
                        "venue": { "type": "string" },
                        "description": { "type": "string", "description": "Brief description, 1-2 sentences" },
                        "event_type": {
                            "type": "string",
                            "enum": ["social", "meeting", "workshop", "community", "celebration"]
                        },
                        "image_url": { "type": "string" },
                        "source_url": { "type": "string", "description": "Direct URL to the event page if available" }
                    },
                    "required": ["title", "starts_at"]
                }
            }
        },
        "required": ["events"]
    })
}

fn into_raw_record(event: ExtractedEvent) -> RawEventRecord {
    RawEventRecord {
        source_id: None,
        title: event.title,
        start: event.starts_at.map(RawTime::Text),
        end: event.ends_at.map(RawTime::Text),
        location: event.location,
        venue: event.venue,
        description: event.description,
        event_type: event.event_type,
        image_url: event.image_url,
        source_url: event.source_url,
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    error: Option<String>,
    data: Option<ExtractData>,
}

#[derive(Debug, Deserialize)]
struct ExtractData {
    extract: Option<ExtractPayload>,
}

#[derive(Debug, Deserialize)]
struct ExtractPayload {
    #[serde(default)]
    events: Vec<ExtractedEvent>,
}

#[derive(Debug, Deserialize)]
struct ExtractedEvent {
    title: Option<String>,
    starts_at: Option<String>,
    ends_at: Option<String>,
    location: Option<String>,
    venue: Option<String>,
    description: Option<String>,
    event_type: Option<String>,
    image_url: Option<String>,
    source_url: Option<String>,
}
