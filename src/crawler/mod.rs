// Crawler plug-in contract (C3), the process-wide registry, and the one
// reference implementation shipped here.

pub mod configurable;
pub mod contract;
pub mod registry;

pub use configurable::ConfigurableCrawler;
pub use contract::{
    enqueue_discovered_links, hash_content, upsert_crawled_page, CrawlerPlugin, ErrorDisposition,
};
pub use registry::CrawlerRegistry;
