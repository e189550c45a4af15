// crawl_pipeline_core: URL queue, TTL-backed dedup registry, crawler plug-in
// contract, demand-driven producer/worker pipeline, and persistence adapter.

pub mod config;
pub mod core;
pub mod crawler;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod processing;
pub mod queue;
pub mod registry;
pub mod storage;
pub mod utils;

// Core types, traits, and errors (C3's Reason taxonomy lives here)
pub use core::{
    ContentProcessor, DnsResolver, ErrorHandler, HttpClientManager, Normalizable, PipelineError,
    Priority, QueueStats, RateLimiter, Reason, RobotsChecker, UrlUtils, WorkItem,
};

// Configuration
pub use config::{
    defaults, CrawlerSettings, DomainRateLimit, Environment, EnvironmentConfig, HttpClientFactory,
    LoggingConfig, PipelineConfig, StorageConfig,
};

// Network components
pub use network::{
    ClientManager, DnsCache, DomainRequestTracker, GlobalRateLimiter, RobotsCache, RobotsHandler,
};

// Processing components
pub use processing::{ContentExtractor, LinkExtractor};

// C1: URL queue
pub use queue::UrlQueue;

// C2: URL registry
pub use registry::{EntryStatus, RegistryEntry, RegistryStats, UrlRegistry};

// C3: crawler plug-in contract, registry, and the reference implementation
pub use crawler::{
    enqueue_discovered_links, hash_content, upsert_crawled_page, ConfigurableCrawler,
    CrawlerPlugin, CrawlerRegistry, ErrorDisposition,
};

// C4 + C5: producer and worker pool
pub use pipeline::{spawn_pipeline, JobContext, WorkerContext, WorkerPool};

// C6: persistence adapter and its models
pub use storage::{
    content_hash, validate_page_attrs, ActivityEntry, CrawlingStats, InMemoryAdapter, Job,
    JobProgress, JobStatus, NewJob, NewSite, Page, PageAttrs, PagedPages, PersistenceAdapter,
    SearchPagesQuery, Site, SiteStats, SiteStatus, SqliteAdapter,
};

// Logging components
pub use logging::{
    CrawlEvent, CrawlEventLogger, CrawlLogFormatter, ErrorEvent, ErrorType, JsonLogFormatter,
    PerformanceEvent, PerformanceEventType,
};

// Utilities
pub use utils::{extract_links_from_html, extract_title_from_html, init_logging};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
