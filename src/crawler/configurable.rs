//! The one real `CrawlerPlugin` this crate ships: a reqwest-backed fetcher
//! generalized from the reference single-site crawler, driven entirely by
//! `CrawlerSettings` so one implementation serves every `Site` row. No
//! bloom filter here -- the registry (C2) already deduplicates, so an
//! in-engine visited-set would only duplicate that work.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::config::{defaults, CrawlerSettings, HttpClientFactory};
use crate::core::error::Reason;
use crate::core::types::{ExtractedContent, Priority, WorkItem};
use crate::logging::CrawlEventLogger;
use crate::network::{DnsCache, GlobalRateLimiter, RobotsHandler};
use crate::processing::content::ContentExtractor;
use crate::processing::discovery::{is_valid_crawl_url, LinkExtractor};
use crate::queue::UrlQueue;
use crate::utils::html::extract_title_from_html;

use super::contract::{CrawlerPlugin, ErrorDisposition};

fn classify_reqwest_error(e: &reqwest::Error) -> Reason {
    if e.is_timeout() {
        Reason::Timeout
    } else {
        Reason::NetworkError(e.to_string())
    }
}

/// One crawler instance per `Site`: its `site_id`, optional seed URL (the
/// site's `base_url`), and the settings unpacked from `Site::config`.
pub struct ConfigurableCrawler {
    site_id: i64,
    crawler_id: String,
    seed_url: Option<Url>,
    settings: CrawlerSettings,
    client: reqwest::Client,
    dns: DnsCache,
    rate_limiter: GlobalRateLimiter,
    robots: RobotsHandler,
    content_extractor: ContentExtractor,
    event_logger: CrawlEventLogger,
}

impl ConfigurableCrawler {
    pub fn new(
        site_id: i64,
        crawler_id: impl Into<String>,
        seed_url: Option<Url>,
        settings: CrawlerSettings,
    ) -> Result<Self> {
        let client = HttpClientFactory::create_default_client(&settings.user_agent)?;

        let mut rate_limiter = GlobalRateLimiter::new(settings.default_rate_limit.clone());
        for (domain, limit) in &settings.domain_rate_limits {
            rate_limiter.add_domain_limit(domain.clone(), limit.clone());
        }

        let crawler_id = crawler_id.into();
        Ok(Self {
            site_id,
            event_logger: CrawlEventLogger::new(crawler_id.clone()),
            crawler_id,
            seed_url,
            content_extractor: ContentExtractor::new(settings.min_content_words),
            robots: RobotsHandler::new(client.clone()),
            client,
            dns: DnsCache::new(),
            rate_limiter,
            settings,
        })
    }

    fn domain_allowed(&self, url: &Url) -> bool {
        if self.settings.allowed_domains.is_empty() {
            return true;
        }
        match url.domain() {
            Some(domain) => self.settings.allowed_domains.iter().any(|allowed| {
                domain == allowed || domain.ends_with(&format!(".{allowed}"))
            }),
            None => false,
        }
    }
}

#[async_trait]
impl CrawlerPlugin for ConfigurableCrawler {
    async fn init(&self, queue: &UrlQueue) -> Result<()> {
        if let Some(seed) = &self.seed_url {
            queue
                .push(WorkItem::new(
                    seed.clone(),
                    self.crawler_id.clone(),
                    Priority::NORMAL,
                ))
                .await;
        }
        Ok(())
    }

    async fn crawl(&self, url: &Url) -> Result<ExtractedContent, Reason> {
        let start = std::time::Instant::now();
        self.event_logger
            .log_crawl_start(url, None, Some(&self.settings.user_agent));

        if self.settings.respect_robots_txt {
            match self.robots.is_allowed_by_robots(url).await {
                Ok(true) => {}
                Ok(false) => {
                    let robots_url = format!(
                        "{}://{}/robots.txt",
                        url.scheme(),
                        url.host_str().unwrap_or("unknown")
                    );
                    self.event_logger.log_robots_blocked(url, &robots_url);
                    return Err(Reason::Other("blocked by robots.txt".to_string()));
                }
                Err(e) => return Err(Reason::from_anyhow_error(&e)),
            }
        }

        let domain = url.host_str().unwrap_or("").to_string();
        self.rate_limiter
            .check_and_wait(&domain)
            .await
            .map_err(|e| Reason::from_anyhow_error(&e))?;
        let _ = self.dns.resolve_domain(&domain).await;

        let response = match self
            .client
            .get(url.clone())
            .header("User-Agent", &self.settings.user_agent)
            .header("Accept", defaults::ACCEPT_HEADER)
            .header("Accept-Language", defaults::FALLBACK_ACCEPT_LANGUAGE)
            .header("Accept-Encoding", defaults::ACCEPT_ENCODING_HEADER)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.event_logger
                    .log_crawl_failure(url, start.elapsed(), &e.to_string(), None, None, false);
                return Err(classify_reqwest_error(&e));
            }
        };

        let status = response.status();
        let status_code = status.as_u16();
        if !status.is_success() {
            self.event_logger.log_crawl_failure(
                url,
                start.elapsed(),
                &format!("http error: {status_code}"),
                None,
                None,
                status_code >= 500,
            );
            return Err(Reason::HttpError(status_code));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = response.content_length();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.event_logger
                    .log_crawl_failure(url, start.elapsed(), &e.to_string(), None, None, false);
                return Err(Reason::NetworkError(e.to_string()));
            }
        };

        if body.is_empty() {
            self.event_logger.log_crawl_failure(
                url,
                start.elapsed(),
                "empty response body",
                None,
                None,
                false,
            );
            return Err(Reason::Other("empty response body".to_string()));
        }

        let (text, word_count) = self
            .content_extractor
            .extract_and_validate(&body)
            .await
            .map_err(|e| Reason::Other(e.to_string()))?;

        if word_count < self.settings.min_content_words {
            let msg = format!(
                "content below minimum word threshold ({word_count} < {})",
                self.settings.min_content_words
            );
            self.event_logger
                .log_crawl_failure(url, start.elapsed(), &msg, None, None, false);
            return Err(Reason::Other(msg));
        }

        let discovered_links = self
            .extract_links(&body, url)
            .await
            .into_iter()
            .map(|link| link.to_string())
            .collect();

        self.event_logger.log_crawl_success(
            url,
            start.elapsed(),
            status_code,
            content_length.unwrap_or(body.len() as u64),
            word_count,
            None,
            None,
            None,
        );

        Ok(ExtractedContent {
            title: extract_title_from_html(&body),
            content: Some(text),
            metadata: HashMap::new(),
            status_code: Some(status_code),
            content_type,
            content_size: content_length.or(Some(body.len() as u64)),
            discovered_links,
        })
    }

    fn site_id(&self) -> i64 {
        self.site_id
    }

    async fn extract_links(&self, html: &str, base: &Url) -> Vec<Url> {
        let extractor = LinkExtractor::new(
            base.clone(),
            self.settings.allowed_domains.clone(),
            self.settings.max_crawl_depth,
        );
        match extractor.extract_links(html, base, 0).await {
            Ok(links) => links
                .into_iter()
                .map(|link| link.url)
                .filter(|url| self.should_crawl_url(url))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn extract_content(&self, html: &str, _url: &Url) -> Result<ExtractedContent> {
        let (text, _word_count) = self.content_extractor.extract_and_validate(html).await?;
        Ok(ExtractedContent {
            title: extract_title_from_html(html),
            content: Some(text),
            ..Default::default()
        })
    }

    fn should_crawl_url(&self, url: &Url) -> bool {
        is_valid_crawl_url(url, &self.settings) && self.domain_allowed(url)
    }

    fn get_config(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();
        config.insert("user_agent".to_string(), self.settings.user_agent.clone());
        config.insert(
            "respect_robots_txt".to_string(),
            self.settings.respect_robots_txt.to_string(),
        );
        config.insert(
            "max_crawl_depth".to_string(),
            self.settings.max_crawl_depth.to_string(),
        );
        config
    }

    fn handle_error(&self, reason: &Reason) -> ErrorDisposition {
        if reason.should_retry() {
            ErrorDisposition::Retry
        } else {
            ErrorDisposition::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_allowed_matches_exact_and_subdomain() {
        let mut settings = CrawlerSettings::default();
        settings.allowed_domains = vec!["example.com".to_string()];
        let crawler =
            ConfigurableCrawler::new(1, "ex", None, settings).expect("client builds");

        assert!(crawler.domain_allowed(&Url::parse("https://example.com/a").unwrap()));
        assert!(crawler.domain_allowed(&Url::parse("https://blog.example.com/a").unwrap()));
        assert!(!crawler.domain_allowed(&Url::parse("https://other.test/a").unwrap()));
    }

    #[test]
    fn empty_allow_list_admits_everything() {
        let crawler =
            ConfigurableCrawler::new(1, "ex", None, CrawlerSettings::default()).unwrap();
        assert!(crawler.domain_allowed(&Url::parse("https://anything.test/a").unwrap()));
    }
}
