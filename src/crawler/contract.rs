//! The plug-in interface every site-specific crawler implements, plus the
//! shared link-store and content-store helpers built on top of it.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::core::error::Reason;
use crate::core::types::{ExtractedContent, Priority, WorkItem};
use crate::queue::UrlQueue;
use crate::registry::UrlRegistry;
use crate::storage::{content_hash, PageAttrs, PersistenceAdapter};

/// Everything a site-specific crawler must expose. Stored as a trait object
/// in `CrawlerRegistry`, so every method is async via `async_trait` rather
/// than `async fn in trait`.
#[async_trait]
pub trait CrawlerPlugin: Send + Sync {
    /// Seed initial URLs into the queue. Idempotent.
    async fn init(&self, queue: &UrlQueue) -> Result<()>;

    /// Fetch `url`, extract content, and discover links, returning both in
    /// `ExtractedContent` on success. Persistence and re-admission of the
    /// discovered links are handled by the pipeline via the link-store and
    /// content-store helpers below -- not duplicated inside each plug-in.
    async fn crawl(&self, url: &Url) -> Result<ExtractedContent, Reason>;

    /// The `Site` row this plug-in's pages are upserted under, used by the
    /// pipeline's content-store helper after a successful `crawl`.
    fn site_id(&self) -> i64;

    /// Produce the unordered set of absolute URLs discovered on the last
    /// fetched page.
    async fn extract_links(&self, html: &str, base: &Url) -> Vec<Url>;

    /// Produce an extracted-content record from a fetched page body.
    async fn extract_content(&self, html: &str, url: &Url) -> Result<ExtractedContent>;

    /// Admission filter: domain allow-list, scheme allow-list, pattern
    /// rules.
    fn should_crawl_url(&self, url: &Url) -> bool;

    /// The crawler's effective configuration, as an opaque string map
    /// (mirrors `Site::config`).
    fn get_config(&self) -> HashMap<String, String>;

    /// Classify a failure reason into a disposition. The default matches
    /// the retry table: retry on anything `Reason::should_retry` accepts,
    /// skip otherwise. Overridable per-crawler.
    fn handle_error(&self, reason: &Reason) -> ErrorDisposition {
        if reason.should_retry() {
            ErrorDisposition::Retry
        } else {
            ErrorDisposition::Skip
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    Retry,
    Skip,
    Stop,
}

/// Shared contract, not a per-crawler reimplementation: filter discovered
/// links by `should_crawl_url`, reject anything already registered in C2,
/// wrap survivors as work items bound to `crawler_id`, and push as a batch.
pub async fn enqueue_discovered_links(
    crawler: &dyn CrawlerPlugin,
    crawler_id: &str,
    links: Vec<Url>,
    queue: &UrlQueue,
    registry: &UrlRegistry,
) -> usize {
    let mut admitted = Vec::new();
    for url in links {
        if !crawler.should_crawl_url(&url) {
            continue;
        }
        if registry.registered(url.as_str()).await {
            continue;
        }
        admitted.push(WorkItem::new(url, crawler_id, Priority::NORMAL));
    }
    queue.push_batch(admitted).await
}

/// Upsert a fetched page's extracted content via the persistence adapter.
/// `content_hash` recomputation happens inside the adapter; this helper
/// only shapes the attrs.
pub async fn upsert_crawled_page(
    storage: &dyn PersistenceAdapter,
    site_id: i64,
    url: &Url,
    extracted: ExtractedContent,
) -> Result<()> {
    let attrs = PageAttrs {
        site_id,
        url: url.to_string(),
        title: extracted.title,
        content: extracted.content,
        metadata: extracted.metadata,
        status_code: extracted.status_code,
        content_type: extracted.content_type,
        content_size: extracted.content_size,
    };
    storage.upsert_page(attrs).await?;
    Ok(())
}

/// Exposed for crawlers that want to precompute a hash themselves (e.g. to
/// skip re-fetching unchanged content) without depending on `storage`
/// directly.
pub fn hash_content(content: &str) -> String {
    content_hash(content)
}
