//! Worker pool (C5): `N` tasks draining the producer's channel, each
//! running up to `max_demand` crawls concurrently via a local `JoinSet` so
//! the aggregate in-flight ceiling is `worker_count × max_demand` per
//! spec.md §4.5/§5.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use url::Url;

use crate::core::error::Reason;
use crate::core::types::WorkItem;
use crate::crawler::contract::{
    enqueue_discovered_links, upsert_crawled_page, CrawlerPlugin, ErrorDisposition,
};
use crate::crawler::registry::CrawlerRegistry;
use crate::queue::UrlQueue;
use crate::registry::UrlRegistry;
use crate::storage::{JobProgress, PersistenceAdapter};

/// Binds a worker pool run to a single audit `Job` row, so per-item
/// outcomes roll up into its progress counters. One `WorkerPool` run is
/// assumed to track one job; multi-site fan-out across distinct jobs is
/// left to the caller running one pool per site.
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    pub job_id: i64,
}

/// Shared, cloneable dependencies every worker task needs. Grouped so
/// `WorkerPool::spawn` doesn't thread five separate `Arc`s through every
/// call site.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<UrlQueue>,
    pub registry: Arc<UrlRegistry>,
    pub storage: Arc<dyn PersistenceAdapter>,
    pub crawlers: Arc<CrawlerRegistry>,
    pub job: Option<JobContext>,
}

/// The pool itself: `worker_count` tasks sharing one receiver, each task
/// running up to `max_demand` crawls concurrently.
pub struct WorkerPool {
    worker_count: usize,
    max_demand: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize, max_demand: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            max_demand: max_demand.max(1),
        }
    }

    /// Spawn every worker task, returning their join handles. The pool has
    /// no separate "stop" signal: workers exit once the channel is closed
    /// (the producer dropped its sender) and their own in-flight crawls
    /// have drained, matching spec.md §5's "workers drain in-flight items,
    /// then exit."
    pub fn spawn(
        &self,
        rx: mpsc::Receiver<WorkItem>,
        ctx: WorkerContext,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let rx = Arc::new(Mutex::new(rx));
        (0..self.worker_count)
            .map(|id| {
                let rx = rx.clone();
                let ctx = ctx.clone();
                let max_demand = self.max_demand;
                tokio::spawn(worker_loop(id, rx, ctx, max_demand))
            })
            .collect()
    }
}

async fn recv_next(rx: &Mutex<mpsc::Receiver<WorkItem>>) -> Option<WorkItem> {
    rx.lock().await.recv().await
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    ctx: WorkerContext,
    max_demand: usize,
) {
    let mut in_flight: JoinSet<()> = JoinSet::new();
    let mut channel_open = true;

    loop {
        if !channel_open && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            item = recv_next(&rx), if channel_open && in_flight.len() < max_demand => {
                match item {
                    Some(item) => {
                        let ctx = ctx.clone();
                        in_flight.spawn(async move {
                            process_item(worker_id, item, ctx).await;
                        });
                    }
                    None => {
                        channel_open = false;
                    }
                }
            }
        }
    }

    debug!(worker_id, "worker exiting, channel drained");
}

/// Run `crawler.crawl(url)` in its own task so a panic inside the crawl
/// future is reported as a join error rather than unwinding into the
/// worker loop -- a panic kills only this one item's task, not the worker.
async fn crawl_isolated(
    crawler: Arc<dyn CrawlerPlugin>,
    url: Url,
) -> Result<crate::core::types::ExtractedContent, Reason> {
    let handle = tokio::spawn(async move { crawler.crawl(&url).await });
    match handle.await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            Err(Reason::Other(format!("panic: {join_err}")))
        }
        Err(_) => Err(Reason::Other("crawl task cancelled".to_string())),
    }
}

async fn process_item(worker_id: usize, item: WorkItem, ctx: WorkerContext) {
    let url_str = item.url.to_string();

    let crawler = match ctx.crawlers.resolve(&item.crawler_id) {
        Ok(crawler) => crawler,
        Err(reason) => {
            warn!(worker_id, url = %url_str, %reason, "unresolvable crawler_id");
            finish_failure(&ctx, &item, reason, false).await;
            return;
        }
    };

    let result = crawl_isolated(crawler.clone(), item.url.clone()).await;

    match result {
        Ok(content) => {
            debug!(worker_id, url = %url_str, "crawl succeeded");
            ctx.queue.mark_processed(&item.url).await;
            ctx.registry.mark_crawled(&url_str, None).await;

            let discovered: Vec<Url> = content
                .discovered_links
                .iter()
                .filter_map(|s| Url::parse(s).ok())
                .collect();
            let found = discovered.len();

            if let Err(e) = upsert_crawled_page(
                ctx.storage.as_ref(),
                crawler.site_id(),
                &item.url,
                content,
            )
            .await
            {
                error!(worker_id, url = %url_str, error = %e, "page upsert failed");
            }

            let admitted = enqueue_discovered_links(
                crawler.as_ref(),
                &item.crawler_id,
                discovered,
                ctx.queue.as_ref(),
                ctx.registry.as_ref(),
            )
            .await;
            let _ = found;

            if let Some(job) = ctx.job {
                let _ = ctx
                    .storage
                    .update_job_progress(
                        job.job_id,
                        JobProgress {
                            pages_crawled: Some(1),
                            pages_found: Some(admitted as i64),
                            errors_count: None,
                        },
                    )
                    .await;
            }
        }
        Err(reason) => {
            let disposition = crawler.handle_error(&reason);
            let retry = matches!(disposition, ErrorDisposition::Retry);
            warn!(worker_id, url = %url_str, %reason, retry, "crawl failed");
            finish_failure(&ctx, &item, reason, retry).await;
        }
    }
}

async fn finish_failure(ctx: &WorkerContext, item: &WorkItem, reason: Reason, retry: bool) {
    let url_str = item.url.to_string();
    ctx.queue.mark_failed(item, retry).await;
    ctx.registry
        .mark_failed(&url_str, Some(&reason.to_string()))
        .await;

    if let Some(job) = ctx.job {
        let _ = ctx
            .storage
            .add_job_error(job.job_id, &format!("{url_str}: {reason}"))
            .await;
        let _ = ctx
            .storage
            .update_job_progress(
                job.job_id,
                JobProgress {
                    pages_crawled: None,
                    pages_found: None,
                    errors_count: Some(1),
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ExtractedContent, Priority};
    use crate::storage::InMemoryAdapter;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedCrawler {
        attempts: AtomicUsize,
        fail_times: usize,
        reason: Reason,
    }

    #[async_trait]
    impl CrawlerPlugin for ScriptedCrawler {
        async fn init(&self, _queue: &UrlQueue) -> Result<()> {
            Ok(())
        }

        async fn crawl(&self, _url: &Url) -> Result<ExtractedContent, Reason> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_times {
                Err(self.reason.clone())
            } else {
                Ok(ExtractedContent {
                    title: Some("Example".into()),
                    content: Some("Hello".into()),
                    content_size: Some(5),
                    ..Default::default()
                })
            }
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

        fn get_config(&self) -> HashMap<String, String> {
            HashMap::new()
        }
    }

    #[tokio::test]
    async fn happy_path_marks_processed_and_crawled() {
        let queue = Arc::new(UrlQueue::new(3));
        let registry = Arc::new(UrlRegistry::new(std::time::Duration::from_secs(3600)));
        let storage: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryAdapter::new());

        let mut crawlers = CrawlerRegistry::new();
        crawlers.register(
            "ex",
            Arc::new(ScriptedCrawler {
                attempts: AtomicUsize::new(0),
                fail_times: 0,
                reason: Reason::Timeout,
            }),
        );

        let url = Url::parse("https://example.com").unwrap();
        queue
            .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
            .await;

        let (tx, rx) = mpsc::channel(4);
        let item = queue.pop().await.unwrap();
        tx.send(item).await.unwrap();
        drop(tx);

        let ctx = WorkerContext {
            queue: queue.clone(),
            registry: registry.clone(),
            storage,
            crawlers: Arc::new(crawlers),
            job: None,
        };

        let pool = WorkerPool::new(1, 2);
        let handles = pool.spawn(rx, ctx);
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(queue.processed_url(&url).await);
        assert!(registry.registered(url.as_str()).await);
        let stats = queue.stats().await;
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.dead, 0);
    }

    #[tokio::test]
    async fn permanent_error_fails_without_retry() {
        let queue = Arc::new(UrlQueue::new(3));
        let registry = Arc::new(UrlRegistry::new(std::time::Duration::from_secs(3600)));
        let storage: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryAdapter::new());

        let mut crawlers = CrawlerRegistry::new();
        crawlers.register(
            "ex",
            Arc::new(ScriptedCrawler {
                attempts: AtomicUsize::new(0),
                fail_times: usize::MAX,
                reason: Reason::HttpError(404),
            }),
        );

        let url = Url::parse("https://example.com/missing").unwrap();
        queue
            .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
            .await;

        let (tx, rx) = mpsc::channel(4);
        let item = queue.pop().await.unwrap();
        tx.send(item).await.unwrap();
        drop(tx);

        let ctx = WorkerContext {
            queue: queue.clone(),
            registry: registry.clone(),
            storage,
            crawlers: Arc::new(crawlers),
            job: None,
        };

        let pool = WorkerPool::new(1, 2);
        let handles = pool.spawn(rx, ctx);
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = queue.stats().await;
        assert_eq!(stats.dead, 1);
        assert_eq!(
            registry.get_status(url.as_str()).await,
            Some(crate::registry::EntryStatus::Failed)
        );
    }

    #[tokio::test]
    async fn invalid_crawler_id_fails_immediately() {
        let queue = Arc::new(UrlQueue::new(3));
        let registry = Arc::new(UrlRegistry::new(std::time::Duration::from_secs(3600)));
        let storage: Arc<dyn PersistenceAdapter> = Arc::new(InMemoryAdapter::new());
        let crawlers = CrawlerRegistry::new();

        let url = Url::parse("https://example.com/unknown").unwrap();
        queue
            .push(WorkItem::new(url.clone(), "missing", Priority::NORMAL))
            .await;

        let (tx, rx) = mpsc::channel(4);
        let item = queue.pop().await.unwrap();
        tx.send(item).await.unwrap();
        drop(tx);

        let ctx = WorkerContext {
            queue: queue.clone(),
            registry: registry.clone(),
            storage,
            crawlers: Arc::new(crawlers),
            job: None,
        };

        let pool = WorkerPool::new(1, 2);
        let handles = pool.spawn(rx, ctx);
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = queue.stats().await;
        assert_eq!(stats.dead, 1);
    }
}
