use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sliding-window rate limit applied per domain by the reference crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRateLimit {
    pub max_requests_per_second: u32,
    pub window_size_ms: u64,
}

impl Default for DomainRateLimit {
    fn default() -> Self {
        Self {
            max_requests_per_second: 2,
            window_size_ms: 1000,
        }
    }
}

/// Configuration consumed by `ConfigurableCrawler`, the one real
/// `CrawlerPlugin` this crate ships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerSettings {
    pub user_agent: String,
    pub allowed_domains: Vec<String>,
    pub avoid_url_extensions: Vec<String>,
    pub min_content_words: usize,
    pub max_crawl_depth: usize,
    pub respect_robots_txt: bool,
    pub default_rate_limit: DomainRateLimit,
    pub domain_rate_limits: HashMap<String, DomainRateLimit>,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            user_agent: defaults::DEFAULT_WEBCRAWLER_USER_AGENT.to_string(),
            allowed_domains: Vec::new(),
            avoid_url_extensions: vec![".pdf".into(), ".jpg".into(), ".png".into(), ".zip".into()],
            min_content_words: defaults::MIN_WORD_COUNT_THRESHOLD,
            max_crawl_depth: defaults::DEFAULT_MAX_DEPTH,
            respect_robots_txt: true,
            default_rate_limit: DomainRateLimit::default(),
            domain_rate_limits: HashMap::new(),
        }
    }
}

/// HTTP client factory shared by the reference crawler and its supporting
/// network components.
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn create_default_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(defaults::MAX_REDIRECTS))
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(
                defaults::REQUEST_TIMEOUT_SECS,
            ))
            .pool_max_idle_per_host(defaults::CONNECTION_POOL_SIZE)
            .pool_idle_timeout(std::time::Duration::from_secs(
                defaults::CONNECTION_IDLE_TIMEOUT_SECS,
            ))
            .build()
    }
}

/// Crawler default constants.
pub mod defaults {
    pub const MAX_REDIRECTS: usize = 10;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECTION_POOL_SIZE: usize = 10;
    pub const CONNECTION_IDLE_TIMEOUT_SECS: u64 = 60;

    pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 1000;
    pub const POLITENESS_DELAY_DIVISOR: u64 = 2;

    pub const DNS_CACHE_TTL_SECS: u64 = 300;
    pub const ROBOTS_CACHE_TTL_HOURS: u64 = 24;

    pub const MIN_CONTENT_LENGTH_BYTES: usize = 100;
    pub const MIN_WORD_COUNT_THRESHOLD: usize = 10;

    pub const ACCEPT_HEADER: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
    pub const ACCEPT_ENCODING_HEADER: &str = "gzip, deflate";
    pub const CONNECTION_HEADER: &str = "keep-alive";

    pub const USER_AGENTS: &[&str] = &[
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:129.0) Gecko/20100101 Firefox/129.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36",
    ];

    pub const FALLBACK_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const ZOMBIE_TASK_TIMEOUT_SECS: u64 = 300;
    pub const DEFAULT_MAX_DEPTH: usize = 3;
    pub const DEFAULT_WEBCRAWLER_USER_AGENT: &str = "crawl-pipeline-core/0.1";
    pub const RATE_LIMIT_LOG_THRESHOLD_MS: u64 = 100;
    pub const SECONDS_TO_MS_MULTIPLIER: f64 = 1000.0;
    pub const UPGRADE_INSECURE_REQUESTS: &str = "1";
}
