//! iCal feed adapter
//!
//! Fetches and parses RFC 5545 calendar documents (Google/Apple exported
//! feeds and plain .ics URLs). Components with no start time are skipped,
//! as are starts more than [`ICAL_BACKFILL_DAYS`] in the past, preventing
//! unbounded historical backfill on first import.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use gather_core::coordinator::IngestTarget;
use gather_core::ports::EventSourceAdapter;
use gather_domain::constants::ICAL_BACKFILL_DAYS;
use gather_domain::{GatherError, RawEventRecord, RawTime, Result};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, EventLike};
use tracing::{debug, instrument};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// iCal feed adapter.
pub struct IcalAdapter {
    http: HttpClient,
}

impl IcalAdapter {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl EventSourceAdapter for IcalAdapter {
    fn kind(&self) -> &'static str {
        "ical"
    }

    #[instrument(skip(self, target), fields(target_id = target.id()))]
    async fn fetch(&self, target: &IngestTarget) -> Result<Vec<RawEventRecord>> {
        let IngestTarget::Calendar(calendar) = target else {
            return Err(GatherError::InvalidInput(
                "ical adapter requires a calendar target".into(),
            ));
        };
        let url = calendar
            .import_url
            .as_deref()
            .ok_or_else(|| GatherError::Config("no import URL configured".into()))?;
        let url = rewrite_webcal(url);

        let response = self.http.send(self.http.get(&url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatherError::Network(format!("feed fetch failed ({status})")));
        }
        let body = response.text().await.map_err(InfraError::from)?;

        parse_feed(&body, Utc::now())
    }
}

/// Rewrite webcal:// subscription URLs to plain https://.
fn rewrite_webcal(url: &str) -> String {
    url.strip_prefix("webcal://")
        .map_or_else(|| url.to_string(), |rest| format!("https://{rest}"))
}

/// Parse a calendar document into raw records, dropping events that start
/// before the backfill cutoff.
pub(crate) fn parse_feed(ics: &str, now: DateTime<Utc>) -> Result<Vec<RawEventRecord>> {
    let calendar: Calendar = ics
        .parse()
        .map_err(|e: String| GatherError::InvalidInput(format!("invalid iCal document: {e}")))?;

    let cutoff = now - Duration::days(ICAL_BACKFILL_DAYS);
    let mut records = Vec::new();

    for component in calendar.iter() {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        let Some(start) = event.get_start() else {
            continue;
        };

        let start_raw = convert_date_time(start);
        if start_instant(&start_raw) < cutoff {
            debug!(uid = ?event.get_uid(), "skipping event past backfill window");
            continue;
        }

        records.push(RawEventRecord {
            source_id: event.get_uid().map(ToString::to_string),
            title: event.get_summary().map(ToString::to_string),
            start: Some(start_raw),
            end: event.get_end().map(convert_date_time),
            location: event.get_location().map(ToString::to_string),
            venue: None,
            description: event.get_description().map(ToString::to_string),
            event_type: None,
            image_url: None,
            source_url: event.property_value("URL").map(ToString::to_string),
        });
    }

    debug!(count = records.len(), "parsed iCal feed");
    Ok(records)
}

/// Date-only values keep all-day semantics; datetimes collapse to UTC.
fn convert_date_time(dt: DatePerhapsTime) -> RawTime {
    match dt {
        DatePerhapsTime::Date(date) => RawTime::Date(date),
        DatePerhapsTime::DateTime(cdt) => {
            let utc = match cdt {
                CalendarDateTime::Utc(dt) => dt,
                CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
                // Without a tz database lookup the safest reading is UTC
                CalendarDateTime::WithTimezone { date_time, tzid: _ } => {
                    Utc.from_utc_datetime(&date_time)
                }
            };
            RawTime::Instant(utc)
        }
    }
}

fn start_instant(raw: &RawTime) -> DateTime<Utc> {
    match raw {
        RawTime::Instant(dt) => *dt,
        RawTime::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now),
        RawTime::Text(_) => Utc::now(),
    }
}
