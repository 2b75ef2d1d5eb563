//! Configurable scraper adapter
//!
//! Listing page -> candidate detail links -> per-page field extraction.
//! Detail pages are fetched sequentially with a randomized politeness delay
//! between requests; a failed detail fetch skips that page, it does not
//! abort the run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gather_core::coordinator::IngestTarget;
use gather_core::ports::EventSourceAdapter;
use gather_domain::constants::{DETAIL_FETCH_DELAY_MAX_MS, DETAIL_FETCH_DELAY_MIN_MS};
use gather_domain::{
    GatherError, RawEventRecord, Result, ScrapeStrategy, SelectorSet, SourceDescriptor,
};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use super::page::{extract_detail_record, extract_listing_links};
use super::registry::CustomScraperRegistry;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Configurable HTML scraper adapter.
pub struct ScrapeAdapter {
    http: HttpClient,
    registry: Arc<CustomScraperRegistry>,
}

impl ScrapeAdapter {
    pub fn new(http: HttpClient, registry: Arc<CustomScraperRegistry>) -> Self {
        Self { http, registry }
    }

    async fn scrape_with_selectors(
        &self,
        descriptor: &SourceDescriptor,
        selectors: &SelectorSet,
    ) -> Result<Vec<RawEventRecord>> {
        let list_url = descriptor.list_url();
        let listing_html = self.fetch_page(&list_url).await?;
        let links = extract_listing_links(&listing_html, descriptor, selectors)?;
        info!(source = %descriptor.slug, links = links.len(), "collected detail links");

        let mut records = Vec::new();
        for (index, link) in links.iter().enumerate() {
            if index > 0 {
                // Politeness: don't hammer the source site
                let delay_ms = {
                    let mut rng = rand::thread_rng();
                    rng.gen_range(DETAIL_FETCH_DELAY_MIN_MS..=DETAIL_FETCH_DELAY_MAX_MS)
                };
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.fetch_page(link).await {
                Ok(html) => {
                    match extract_detail_record(&html, link, descriptor, selectors) {
                        Some(record) => records.push(record),
                        None => debug!(url = %link, "detail page yielded no usable record"),
                    }
                }
                Err(e) => warn!(url = %link, error = %e, "detail page fetch failed"),
            }
        }

        info!(source = %descriptor.slug, count = records.len(), "scrape run extracted records");
        Ok(records)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.http.send(self.http.get(url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatherError::Network(format!("page fetch failed ({status}): {url}")));
        }
        response.text().await.map_err(|e| InfraError::from(e).into())
    }
}

#[async_trait]
impl EventSourceAdapter for ScrapeAdapter {
    fn kind(&self) -> &'static str {
        "scrape"
    }

    #[instrument(skip(self, target), fields(target_id = target.id()))]
    async fn fetch(&self, target: &IngestTarget) -> Result<Vec<RawEventRecord>> {
        let IngestTarget::Source(descriptor) = target else {
            return Err(GatherError::InvalidInput(
                "scrape adapter requires a source target".into(),
            ));
        };

        match &descriptor.strategy {
            ScrapeStrategy::Custom { adapter } => {
                let scraper = self.registry.get(adapter)?;
                scraper.scrape(descriptor, &self.http).await
            }
            ScrapeStrategy::Selectors { selectors } => {
                self.scrape_with_selectors(descriptor, selectors).await
            }
        }
    }
}
