//! HTTP adapter coverage against a local mock server.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use gather_core::coordinator::IngestTarget;
use gather_core::ports::EventSourceAdapter;
use gather_domain::{ExtractConfig, GatherError, ImportKind, RawTime};
use gather_infra::integrations::google::StaticTokenProvider;
use gather_infra::integrations::{
    CustomScraperRegistry, ExtractAdapter, ExtractClient, GoogleCalendarAdapter, IcalAdapter,
    OAuthTokenProvider, ScrapeAdapter,
};
use gather_infra::integrations::google::AccessTokenProvider;
use gather_infra::HttpClient;
use serde_json::json;
use support::calendar;
use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::builder().max_attempts(1).build().unwrap()
}

#[tokio::test]
async fn ical_adapter_fetches_and_parses_a_feed() {
    let server = MockServer::start().await;
    let start = (Utc::now() + Duration::days(7)).format("%Y%m%dT%H%M%SZ");
    let ics = format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n\
         BEGIN:VEVENT\r\nUID:evt-1@feed\r\nDTSTART:{start}\r\nSUMMARY:Jazz Night\r\nEND:VEVENT\r\n\
         END:VCALENDAR\r\n"
    );

    Mock::given(method("GET"))
        .and(path("/feed.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ics))
        .mount(&server)
        .await;

    let mut cal = calendar("cal-1", ImportKind::Ical);
    cal.import_url = Some(format!("{}/feed.ics", server.uri()));

    let adapter = IcalAdapter::new(http());
    let records = adapter.fetch(&IngestTarget::Calendar(cal)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_id.as_deref(), Some("evt-1@feed"));
    assert_eq!(records[0].title.as_deref(), Some("Jazz Night"));
}

#[tokio::test]
async fn ical_adapter_maps_http_failures_to_network_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.ics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut cal = calendar("cal-1", ImportKind::Ical);
    cal.import_url = Some(format!("{}/feed.ics", server.uri()));

    let adapter = IcalAdapter::new(http());
    let result = adapter.fetch(&IngestTarget::Calendar(cal)).await;
    assert!(matches!(result, Err(GatherError::Network(_))));
}

#[tokio::test]
async fn google_adapter_paginates_the_events_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("pageToken", "page-2"))
        .and(bearer_token("token-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "g-2", "summary": "Second", "start": { "dateTime": "2026-06-06T10:00:00Z" }, "end": { "dateTime": "2026-06-06T11:00:00Z" } }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(bearer_token("token-xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "g-1", "summary": "First", "start": { "dateTime": "2026-06-05T10:00:00Z" }, "end": { "dateTime": "2026-06-05T11:00:00Z" }, "htmlLink": "https://calendar.google.test/event?eid=g-1" },
                { "id": "g-allday", "summary": "All Day", "start": { "date": "2026-06-07" }, "end": { "date": "2026-06-08" } }
            ],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let mut cal = calendar("cal-1", ImportKind::Google);
    cal.import_source_id = Some("primary".into());

    let adapter = GoogleCalendarAdapter::with_api_base(
        http(),
        Arc::new(StaticTokenProvider("token-xyz".into())),
        &server.uri(),
    );
    let records = adapter.fetch(&IngestTarget::Calendar(cal)).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].source_id.as_deref(), Some("g-1"));
    assert_eq!(
        records[0].source_url.as_deref(),
        Some("https://calendar.google.test/event?eid=g-1")
    );
    assert!(matches!(records[1].start, Some(RawTime::Date(_))));
    assert_eq!(records[2].source_id.as_deref(), Some("g-2"));
}

#[tokio::test]
async fn google_authorization_failure_is_terminal_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut cal = calendar("cal-1", ImportKind::Google);
    cal.import_source_id = Some("primary".into());

    let adapter = GoogleCalendarAdapter::with_api_base(
        http(),
        Arc::new(StaticTokenProvider("expired".into())),
        &server.uri(),
    );
    let result = adapter.fetch(&IngestTarget::Calendar(cal)).await;
    assert!(matches!(result, Err(GatherError::Auth(_))));
}

#[tokio::test]
async fn token_provider_refreshes_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OAuthTokenProvider::with_token_url(
        http(),
        "client-id".into(),
        "client-secret".into(),
        "refresh-token".into(),
        &format!("{}/token", server.uri()),
    );

    assert_eq!(provider.access_token().await.unwrap(), "fresh-token");
    // Second call is served from the cached, unexpired token
    assert_eq!(provider.access_token().await.unwrap(), "fresh-token");
}

#[tokio::test]
async fn rejected_refresh_token_needs_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let provider = OAuthTokenProvider::with_token_url(
        http(),
        "client-id".into(),
        "client-secret".into(),
        "revoked".into(),
        &format!("{}/token", server.uri()),
    );

    assert!(matches!(provider.access_token().await, Err(GatherError::Auth(_))));
}

#[tokio::test]
async fn extract_adapter_maps_the_response_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(bearer_token("fc-key"))
        .and(body_partial_json(json!({ "formats": ["extract"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "extract": { "events": [
                {
                    "title": "Kite Festival",
                    "starts_at": "2026-06-06T10:00:00Z",
                    "venue": "Zilker Park",
                    "event_type": "community"
                }
            ] } }
        })))
        .mount(&server)
        .await;

    let mut cal = calendar("cal-1", ImportKind::Extract);
    cal.import_url = Some("https://visitaustin.test/events".into());
    cal.extraction_prompt = Some("family events this weekend".into());

    let client = ExtractClient::new(
        http(),
        ExtractConfig {
            api_url: format!("{}/v1/scrape", server.uri()),
            api_key: Some("fc-key".into()),
            timeout_seconds: 5,
        },
    );
    let adapter = ExtractAdapter::new(client);
    let records = adapter.fetch(&IngestTarget::Calendar(cal)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Kite Festival"));
    assert_eq!(records[0].venue.as_deref(), Some("Zilker Park"));
    assert_eq!(records[0].event_type.as_deref(), Some("community"));
}

#[tokio::test]
async fn extract_error_envelope_fails_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "page could not be rendered"
        })))
        .mount(&server)
        .await;

    let client = ExtractClient::new(
        http(),
        ExtractConfig {
            api_url: format!("{}/v1/scrape", server.uri()),
            api_key: Some("fc-key".into()),
            timeout_seconds: 5,
        },
    );

    let result = client
        .extract_events("https://x.test", "anything", Utc::now().date_naive())
        .await;
    match result {
        Err(GatherError::Network(message)) => assert!(message.contains("page could not be rendered")),
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn extract_without_api_key_is_a_config_error() {
    let client = ExtractClient::new(
        http(),
        ExtractConfig { api_url: "https://x.test".into(), api_key: None, timeout_seconds: 5 },
    );
    let result = client
        .extract_events("https://x.test", "anything", Utc::now().date_naive())
        .await;
    assert!(matches!(result, Err(GatherError::Config(_))));
}

#[tokio::test]
async fn scrape_adapter_walks_listing_and_detail_pages() {
    let server = MockServer::start().await;

    let listing = r#"<html><body>
            <a href="/events/jazz">Jazz</a>
            <a href="/events/missing">Gone</a>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/events/jazz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <h1>Jazz Night</h1>
                <time datetime="2026-06-05T19:00:00Z">June 5</time>
                <div class="venue">Stubbs</div>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    // One dead detail link must not abort the run
    Mock::given(method("GET"))
        .and(path("/events/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut descriptor = support::descriptor("src-1", "do512");
    descriptor.base_url = server.uri();
    descriptor.list_path = "/events".into();

    let adapter = ScrapeAdapter::new(http(), Arc::new(CustomScraperRegistry::new()));
    let records = adapter.fetch(&IngestTarget::Source(descriptor)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title.as_deref(), Some("Jazz Night"));
    assert_eq!(records[0].venue.as_deref(), Some("Stubbs"));
    assert_eq!(
        records[0].start,
        Some(RawTime::Text("2026-06-05T19:00:00Z".into()))
    );
}
