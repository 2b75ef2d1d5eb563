//! Custom scraper registry
//!
//! Some sources need bespoke extraction logic that selectors can't express.
//! Those register here by name; a source descriptor referencing an
//! unregistered name is a configuration error, not a retriable failure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gather_domain::{GatherError, RawEventRecord, Result, SourceDescriptor};

use crate::http::HttpClient;

/// A hand-written scraper for one specific site.
#[async_trait]
pub trait CustomScraper: Send + Sync {
    /// Registry key referenced by source descriptors.
    fn name(&self) -> &'static str;

    /// Fetch and extract raw records for the source.
    async fn scrape(
        &self,
        descriptor: &SourceDescriptor,
        http: &HttpClient,
    ) -> Result<Vec<RawEventRecord>>;
}

/// Static name -> implementation lookup.
#[derive(Default)]
pub struct CustomScraperRegistry {
    scrapers: HashMap<&'static str, Arc<dyn CustomScraper>>,
}

impl CustomScraperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scraper: Arc<dyn CustomScraper>) {
        self.scrapers.insert(scraper.name(), scraper);
    }

    /// Resolve a scraper by name.
    ///
    /// # Errors
    /// `Config` when the name is not registered.
    pub fn get(&self, name: &str) -> Result<Arc<dyn CustomScraper>> {
        self.scrapers
            .get(name)
            .cloned()
            .ok_or_else(|| GatherError::Config(format!("unknown custom scraper: {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullScraper;

    #[async_trait]
    impl CustomScraper for NullScraper {
        fn name(&self) -> &'static str {
            "null"
        }

        async fn scrape(
            &self,
            _descriptor: &SourceDescriptor,
            _http: &HttpClient,
        ) -> Result<Vec<RawEventRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn registered_scrapers_resolve_by_name() {
        let mut registry = CustomScraperRegistry::new();
        registry.register(Arc::new(NullScraper));
        assert!(registry.get("null").is_ok());
    }

    #[test]
    fn unknown_names_are_a_config_error() {
        let registry = CustomScraperRegistry::new();
        assert!(matches!(registry.get("missing"), Err(GatherError::Config(_))));
    }
}
