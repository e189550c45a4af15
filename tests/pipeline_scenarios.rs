//! End-to-end scenarios running the real producer/worker pipeline against
//! an `InMemoryAdapter` and a scripted crawler plug-in, covering the
//! retry-classification and dedup boundaries the unit tests don't exercise
//! across module seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crawl_pipeline_core::config::PipelineConfig;
use crawl_pipeline_core::core::types::ExtractedContent;
use crawl_pipeline_core::core::{Priority, Reason, WorkItem};
use crawl_pipeline_core::crawler::{CrawlerPlugin, CrawlerRegistry, ErrorDisposition};
use crawl_pipeline_core::pipeline::{spawn_pipeline, JobContext};
use crawl_pipeline_core::queue::UrlQueue;
use crawl_pipeline_core::registry::UrlRegistry;
use crawl_pipeline_core::storage::{
    content_hash, InMemoryAdapter, NewJob, NewSite, PersistenceAdapter,
};

/// A crawler plug-in whose `crawl` outcome per URL is pre-scripted, so
/// scenarios can exercise retry/terminal-failure paths without real I/O.
struct ScriptedCrawler {
    site_id: i64,
    seed: Option<Url>,
    scripts: Mutex<HashMap<String, VecDeque<Result<ExtractedContent, Reason>>>>,
    attempts: AtomicUsize,
    allowed_domains: Vec<String>,
}

impl ScriptedCrawler {
    fn new(site_id: i64, seed: Option<Url>) -> Self {
        Self {
            site_id,
            seed,
            scripts: Mutex::new(HashMap::new()),
            attempts: AtomicUsize::new(0),
            allowed_domains: Vec::new(),
        }
    }

    fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    async fn script(&self, url: &str, outcomes: Vec<Result<ExtractedContent, Reason>>) {
        self.scripts
            .lock()
            .await
            .insert(url.to_string(), VecDeque::from(outcomes));
    }
}

#[async_trait]
impl CrawlerPlugin for ScriptedCrawler {
    async fn init(&self, queue: &UrlQueue) -> Result<()> {
        if let Some(seed) = &self.seed {
            queue
                .push(WorkItem::new(seed.clone(), "ex", Priority::NORMAL))
                .await;
        }
        Ok(())
    }

    async fn crawl(&self, url: &Url) -> Result<ExtractedContent, Reason> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().await;
        let queue = scripts.get_mut(url.as_str());
        match queue.and_then(|q| q.pop_front()) {
            Some(outcome) => outcome,
            None => Err(Reason::Other("no script left for url".to_string())),
        }
    }

    fn site_id(&self) -> i64 {
        self.site_id
    }

    async fn extract_links(&self, _html: &str, _base: &Url) -> Vec<Url> {
        Vec::new()
    }

    async fn extract_content(&self, _html: &str, _url: &Url) -> Result<ExtractedContent> {
        Ok(ExtractedContent::default())
    }

    fn should_crawl_url(&self, url: &Url) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        url.domain()
            .map(|d| self.allowed_domains.iter().any(|allowed| d == allowed))
            .unwrap_or(false)
    }

    fn get_config(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn handle_error(&self, reason: &Reason) -> ErrorDisposition {
        if reason.should_retry() {
            ErrorDisposition::Retry
        } else {
            ErrorDisposition::Skip
        }
    }
}

/// Wires a queue/registry/storage/registered-crawler pipeline and runs it
/// for `settle` before cancelling, giving in-flight scripted work enough
/// time to complete deterministically without a real network.
async fn run_pipeline(
    crawler: Arc<ScriptedCrawler>,
    settle: Duration,
) -> (Arc<UrlQueue>, Arc<UrlRegistry>, Arc<InMemoryAdapter>, i64) {
    let storage = InMemoryAdapter::new();
    let site = storage
        .create_site(NewSite {
            name: "ex".into(),
            base_url: "https://example.com".into(),
            crawler_id: "ex".into(),
            config: HashMap::new(),
        })
        .await
        .unwrap();
    let job = storage
        .create_job(NewJob {
            site_id: site.id,
            config: HashMap::new(),
        })
        .await
        .unwrap();
    storage.start_job(job.id).await.unwrap();

    let queue = Arc::new(UrlQueue::new(3));
    let registry = Arc::new(UrlRegistry::new(Duration::from_secs(3600)));

    let mut crawlers = CrawlerRegistry::new();
    crawlers.register("ex", crawler.clone() as Arc<dyn CrawlerPlugin>);
    let crawlers = Arc::new(crawlers);

    crawler.init(&queue).await.unwrap();

    let config = PipelineConfig {
        worker_count: 1,
        max_demand: 2,
        retry_ceiling: 3,
        crawled_ttl_seconds: 3600,
        sweep_interval_ms: 3_600_000,
        producer_poll_ms: 20,
    };

    let token = CancellationToken::new();
    let handles = spawn_pipeline(
        &config,
        queue.clone(),
        registry.clone(),
        storage.clone() as Arc<dyn PersistenceAdapter>,
        crawlers,
        Some(JobContext { job_id: job.id }),
        token.clone(),
    );

    tokio::time::sleep(settle).await;
    token.cancel();
    for handle in handles {
        let _ = handle.await;
    }

    (queue, registry, storage, job.id)
}

#[tokio::test]
async fn s1_happy_path_records_page_and_queue_state() {
    let seed = Url::parse("https://example.com").unwrap();
    let crawler = Arc::new(ScriptedCrawler::new(1, Some(seed.clone())));
    crawler
        .script(
            seed.as_str(),
            vec![Ok(ExtractedContent {
                title: Some("Example".to_string()),
                content: Some("Hello".to_string()),
                content_size: Some(5),
                ..Default::default()
            })],
        )
        .await;

    let (queue, registry, storage, _job_id) =
        run_pipeline(crawler, Duration::from_millis(150)).await;

    let page = storage
        .get_site_by_url("https://example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.pages_count, 1);

    let stored = storage
        .search_pages(crawl_pipeline_core::storage::SearchPagesQuery {
            query: String::new(),
            site_id: None,
            page: 1,
            per_page: 10,
        })
        .await
        .unwrap();
    assert_eq!(stored.total, 1);
    assert_eq!(
        stored.pages[0].content_hash.as_deref(),
        Some(content_hash("Hello").as_str())
    );

    let stats = queue.stats().await;
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.dead, 0);

    assert!(registry.registered("https://example.com").await);
}

#[tokio::test]
async fn s2_dedup_push_twice_admits_once() {
    let queue = Arc::new(UrlQueue::new(3));
    let url = Url::parse("https://a.test").unwrap();
    assert!(
        queue
            .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
            .await
    );
    assert!(
        !queue
            .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
            .await
    );

    assert_eq!(queue.size().await, 1);
    assert_eq!(queue.stats().await.pending, 1);
}

#[tokio::test]
async fn s3_retry_then_success_reaches_crawled_with_ttl() {
    let seed = Url::parse("https://b.test").unwrap();
    let crawler = Arc::new(ScriptedCrawler::new(1, Some(seed.clone())));
    crawler
        .script(
            seed.as_str(),
            vec![
                Err(Reason::Timeout),
                Err(Reason::Timeout),
                Ok(ExtractedContent::default()),
            ],
        )
        .await;

    let (queue, registry, _storage, _job_id) =
        run_pipeline(crawler.clone(), Duration::from_millis(200)).await;

    assert_eq!(crawler.attempts.load(Ordering::SeqCst), 3);

    let stats = queue.stats().await;
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.dead, 0);

    assert_eq!(
        registry.get_status(seed.as_str()).await,
        Some(crawl_pipeline_core::registry::EntryStatus::Crawled)
    );
}

#[tokio::test]
async fn s4_retry_exhaustion_marks_terminally_failed() {
    let seed = Url::parse("https://c.test").unwrap();
    let crawler = Arc::new(ScriptedCrawler::new(1, Some(seed.clone())));
    // retry_ceiling is 3: attempts 0..=3 inclusive is 4 runs total before
    // the queue gives up and marks it dead.
    crawler
        .script(
            seed.as_str(),
            vec![
                Err(Reason::NetworkError(":reset".to_string())),
                Err(Reason::NetworkError(":reset".to_string())),
                Err(Reason::NetworkError(":reset".to_string())),
                Err(Reason::NetworkError(":reset".to_string())),
            ],
        )
        .await;

    let (queue, registry, _storage, _job_id) =
        run_pipeline(crawler.clone(), Duration::from_millis(250)).await;

    assert_eq!(crawler.attempts.load(Ordering::SeqCst), 4);
    let stats = queue.stats().await;
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.dead, 1);

    assert_eq!(
        registry.get_status(seed.as_str()).await,
        Some(crawl_pipeline_core::registry::EntryStatus::Failed)
    );
    let entry = registry.get_entry(seed.as_str()).await.unwrap();
    assert!(entry.last_error.unwrap().contains(":reset"));
}

#[tokio::test]
async fn s5_permanent_error_skips_without_retry() {
    let seed = Url::parse("https://d.test/missing").unwrap();
    let crawler = Arc::new(ScriptedCrawler::new(1, Some(seed.clone())));
    crawler
        .script(seed.as_str(), vec![Err(Reason::HttpError(404))])
        .await;

    let (queue, registry, _storage, _job_id) =
        run_pipeline(crawler.clone(), Duration::from_millis(150)).await;

    assert_eq!(crawler.attempts.load(Ordering::SeqCst), 1);
    let stats = queue.stats().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.dead, 1);
    assert_eq!(
        registry.get_status(seed.as_str()).await,
        Some(crawl_pipeline_core::registry::EntryStatus::Failed)
    );
    assert_eq!(
        crawler.handle_error(&Reason::HttpError(404)),
        ErrorDisposition::Skip
    );
}

#[tokio::test]
async fn s6_link_discovery_respects_domain_allow_list() {
    let crawler = Arc::new(
        ScriptedCrawler::new(1, None).with_allowed_domains(vec!["example.com".to_string()]),
    );

    let admitted_url = Url::parse("https://example.com/a").unwrap();
    let rejected_url = Url::parse("https://other.test/x").unwrap();

    assert!(crawler.should_crawl_url(&admitted_url));
    assert!(!crawler.should_crawl_url(&rejected_url));

    let queue = Arc::new(UrlQueue::new(3));
    let registry = Arc::new(UrlRegistry::new(Duration::from_secs(3600)));
    let admitted = crawl_pipeline_core::crawler::enqueue_discovered_links(
        crawler.as_ref(),
        "ex",
        vec![admitted_url.clone(), rejected_url],
        &queue,
        &registry,
    )
    .await;

    assert_eq!(admitted, 1);
    let popped = queue.pop().await.unwrap();
    assert_eq!(popped.url, admitted_url);
    assert!(queue.pop().await.is_none());
}
