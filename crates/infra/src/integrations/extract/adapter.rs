//! AI page-extraction adapter

use async_trait::async_trait;
use chrono::Utc;
use gather_core::coordinator::IngestTarget;
use gather_core::ports::EventSourceAdapter;
use gather_domain::{GatherError, RawEventRecord, Result};
use tracing::instrument;

use super::client::ExtractClient;

/// Fallback prompt for calendars configured without one.
const DEFAULT_PROMPT: &str = "upcoming events";

/// AI page-extraction adapter.
pub struct ExtractAdapter {
    client: ExtractClient,
}

impl ExtractAdapter {
    pub fn new(client: ExtractClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventSourceAdapter for ExtractAdapter {
    fn kind(&self) -> &'static str {
        "extract"
    }

    #[instrument(skip(self, target), fields(target_id = target.id()))]
    async fn fetch(&self, target: &IngestTarget) -> Result<Vec<RawEventRecord>> {
        let IngestTarget::Calendar(calendar) = target else {
            return Err(GatherError::InvalidInput(
                "extract adapter requires a calendar target".into(),
            ));
        };
        let url = calendar
            .import_url
            .as_deref()
            .ok_or_else(|| GatherError::Config("no page URL configured for extraction".into()))?;
        let prompt = calendar.extraction_prompt.as_deref().unwrap_or(DEFAULT_PROMPT);

        self.client
            .extract_events(url, prompt, Utc::now().date_naive())
            .await
    }
}
