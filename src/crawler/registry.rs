//! The process-wide `crawler_id -> CrawlerPlugin` map (spec.md's "Crawler
//! plug-in registration"). Constructed and populated at startup, then
//! handed to `pipeline::worker::WorkerPool` and `pipeline::producer`'s
//! callers as a dependency -- never a `static`/`lazy_static` global, per
//! spec.md §9 ("avoid process-wide globals so tests can instantiate
//! isolated pipelines").

use std::collections::HashMap;
use std::sync::Arc;

use crate::crawler::contract::CrawlerPlugin;
use crate::core::error::Reason;

/// Maps a stable crawler id to the plug-in implementation that handles it.
/// Resolution failure is the `Reason::InvalidCrawler` the pipeline reports
/// per spec.md §4.5 step 1.
#[derive(Default, Clone)]
pub struct CrawlerRegistry {
    crawlers: HashMap<String, Arc<dyn CrawlerPlugin>>,
}

impl CrawlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plug-in under `crawler_id`, replacing any prior
    /// registration under the same id.
    pub fn register(&mut self, crawler_id: impl Into<String>, plugin: Arc<dyn CrawlerPlugin>) {
        self.crawlers.insert(crawler_id.into(), plugin);
    }

    pub fn get(&self, crawler_id: &str) -> Option<Arc<dyn CrawlerPlugin>> {
        self.crawlers.get(crawler_id).cloned()
    }

    /// Resolve `crawler_id` or produce the `invalid_crawler` reason the
    /// pipeline surfaces when a work item names an unregistered or absent
    /// crawler.
    pub fn resolve(&self, crawler_id: &str) -> Result<Arc<dyn CrawlerPlugin>, Reason> {
        self.get(crawler_id)
            .ok_or_else(|| Reason::InvalidCrawler(crawler_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.crawlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawlers.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.crawlers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::contract::ErrorDisposition;
    use crate::core::types::ExtractedContent;
    use crate::queue::UrlQueue;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;
    use url::Url;

    struct NoopCrawler;

    #[async_trait]
    impl CrawlerPlugin for NoopCrawler {
        async fn init(&self, _queue: &UrlQueue) -> Result<()> {
            Ok(())
        }

        async fn crawl(&self, _url: &Url) -> Result<ExtractedContent, Reason> {
            Ok(ExtractedContent::default())
        }

        fn site_id(&self) -> i64 {
            1
        }

        async fn extract_links(&self, _html: &str, _base: &Url) -> Vec<Url> {
            Vec::new()
        }

        async fn extract_content(&self, _html: &str, _url: &Url) -> Result<ExtractedContent> {
            Ok(ExtractedContent::default())
        }

        fn should_crawl_url(&self, _url: &Url) -> bool {
            true
        }

        fn get_config(&self) -> StdHashMap<String, String> {
            StdHashMap::new()
        }

        fn handle_error(&self, _reason: &Reason) -> ErrorDisposition {
            ErrorDisposition::Skip
        }
    }

    #[test]
    fn resolve_unknown_crawler_is_invalid_crawler() {
        let registry = CrawlerRegistry::new();
        let err = registry.resolve("missing").unwrap_err();
        assert!(matches!(err, Reason::InvalidCrawler(id) if id == "missing"));
    }

    #[test]
    fn resolve_registered_crawler_succeeds() {
        let mut registry = CrawlerRegistry::new();
        registry.register("noop", Arc::new(NoopCrawler));
        assert!(registry.resolve("noop").is_ok());
        assert_eq!(registry.len(), 1);
    }
}
