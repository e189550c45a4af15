use crate::core::{Priority, QueueStats, WorkItem};
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

/// Wrapper giving `WorkItem` a priority-then-FIFO ordering inside the
/// `BinaryHeap` (a max-heap, so higher priority pops first).
#[derive(Debug, Clone)]
struct PrioritizedItem {
    item: WorkItem,
}

impl PartialEq for PrioritizedItem {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority == other.item.priority
    }
}

impl Eq for PrioritizedItem {}

impl PartialOrd for PrioritizedItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.item
            .priority
            .cmp(&other.item.priority)
            .then_with(|| other.item.added_at.cmp(&self.item.added_at))
    }
}

/// In-flight/processed bookkeeping key: the normalized URL string, not the
/// `Url` type, so two equivalent URLs with different query-parameter order
/// collide the way the registry expects.
fn key(url: &Url) -> String {
    crate::core::UrlUtils::normalize(url.as_str())
}

/// FIFO-with-priority work queue (C1). A single lock-guarded struct, not a
/// channel actor: its operations never block on I/O, so every caller can
/// just take the lock and go.
pub struct UrlQueue {
    pending: Arc<RwLock<BinaryHeap<PrioritizedItem>>>,
    pending_keys: Arc<RwLock<HashSet<String>>>,
    in_flight: Arc<RwLock<HashSet<String>>>,
    processed: Arc<RwLock<HashSet<String>>>,
    stats: Arc<RwLock<QueueStats>>,
    retry_ceiling: u32,
}

impl UrlQueue {
    pub fn new(retry_ceiling: u32) -> Self {
        Self {
            pending: Arc::new(RwLock::new(BinaryHeap::new())),
            pending_keys: Arc::new(RwLock::new(HashSet::new())),
            in_flight: Arc::new(RwLock::new(HashSet::new())),
            processed: Arc::new(RwLock::new(HashSet::new())),
            stats: Arc::new(RwLock::new(QueueStats::default())),
            retry_ceiling,
        }
    }

    /// Enqueue a single work item iff its URL is absent from the pending,
    /// in-flight, and processed sets; otherwise silently drop. Returns
    /// whether the item was admitted.
    pub async fn push(&self, item: WorkItem) -> bool {
        let k = key(&item.url);
        let pending_keys = self.pending_keys.read().await;
        let in_flight = self.in_flight.read().await;
        let processed = self.processed.read().await;
        if pending_keys.contains(&k) || in_flight.contains(&k) || processed.contains(&k) {
            debug!(url = %item.url, "dropping duplicate work item");
            return false;
        }
        drop(pending_keys);
        drop(in_flight);
        drop(processed);

        debug!(url = %item.url, crawler_id = %item.crawler_id, "pushing work item");
        self.pending_keys.write().await.insert(k);
        let mut pending = self.pending.write().await;
        pending.push(PrioritizedItem { item });
        drop(pending);
        self.stats.write().await.pending += 1;
        true
    }

    /// Enqueue a batch of work items in one locked section, applying the
    /// same admission check as `push` to each. Returns the count admitted.
    pub async fn push_batch(&self, items: Vec<WorkItem>) -> usize {
        let pending_keys = self.pending_keys.read().await;
        let in_flight = self.in_flight.read().await;
        let processed = self.processed.read().await;
        let mut seen: HashSet<String> = HashSet::new();
        let admitted: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| {
                let k = key(&item.url);
                let fresh = !pending_keys.contains(&k)
                    && !in_flight.contains(&k)
                    && !processed.contains(&k)
                    && seen.insert(k);
                fresh
            })
            .collect();
        drop(pending_keys);
        drop(in_flight);
        drop(processed);

        let mut pending_keys = self.pending_keys.write().await;
        let mut pending = self.pending.write().await;
        let mut stats = self.stats.write().await;
        for item in &admitted {
            pending_keys.insert(key(&item.url));
            pending.push(PrioritizedItem {
                item: item.clone(),
            });
            stats.pending += 1;
        }
        admitted.len()
    }

    /// Pop the highest-priority ready item, marking it in-flight.
    pub async fn pop(&self) -> Option<WorkItem> {
        let mut pending = self.pending.write().await;
        let prioritized = pending.pop()?;
        drop(pending);

        let item = prioritized.item;
        let k = key(&item.url);
        self.pending_keys.write().await.remove(&k);
        self.in_flight.write().await.insert(k);

        let mut stats = self.stats.write().await;
        stats.pending = stats.pending.saturating_sub(1);
        stats.in_flight += 1;

        Some(item)
    }

    /// Mark an in-flight URL as successfully processed.
    pub async fn mark_processed(&self, url: &Url) {
        let k = key(url);
        self.in_flight.write().await.remove(&k);
        self.processed.write().await.insert(k);

        let mut stats = self.stats.write().await;
        stats.in_flight = stats.in_flight.saturating_sub(1);
        stats.processed += 1;
    }

    /// Mark an in-flight item as failed. `retry` is the caller's retry
    /// classification (e.g. `Reason::should_retry`), computed outside the
    /// queue -- this method only enforces the ceiling on top of it. Every
    /// call increments `stats.failed` per spec.md §4.1, regardless of
    /// whether the item is requeued or dropped terminally. When `retry` is
    /// true and the item has not yet hit the retry ceiling, it is
    /// re-enqueued as the next attempt, preserving the item's own
    /// `crawler_id` and incrementing from its own retry counter, never
    /// reconstructed from scratch. Returns `true` if the item was
    /// requeued, `false` if it was dropped as dead (either because
    /// `retry` was false or the ceiling was exceeded).
    pub async fn mark_failed(&self, item: &WorkItem, retry: bool) -> bool {
        self.in_flight.write().await.remove(&key(&item.url));

        if retry && item.retries < self.retry_ceiling {
            let next = item.next_attempt();
            self.pending_keys.write().await.insert(key(&next.url));
            self.pending
                .write()
                .await
                .push(PrioritizedItem { item: next });

            let mut stats = self.stats.write().await;
            stats.in_flight = stats.in_flight.saturating_sub(1);
            stats.pending += 1;
            stats.failed += 1;
            true
        } else {
            if retry {
                warn!(url = %item.url, retries = item.retries, "work item exceeded retry ceiling");
            } else {
                debug!(url = %item.url, "work item failed with a non-retryable reason");
            }
            let mut stats = self.stats.write().await;
            stats.in_flight = stats.in_flight.saturating_sub(1);
            stats.failed += 1;
            stats.dead += 1;
            false
        }
    }

    pub async fn stats(&self) -> QueueStats {
        self.stats.read().await.clone()
    }

    pub async fn size(&self) -> usize {
        self.pending.read().await.len()
    }

    pub async fn processed_url(&self, url: &Url) -> bool {
        self.processed.read().await.contains(&key(url))
    }

    pub async fn processing_urls(&self) -> Vec<String> {
        self.in_flight.read().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.pending.write().await.clear();
        self.pending_keys.write().await.clear();
        self.in_flight.write().await.clear();
        self.processed.write().await.clear();
        *self.stats.write().await = QueueStats::default();
    }

    /// Highest priority band convenience constructor for a work item, used
    /// by callers that only have a URL and crawler id to hand.
    pub fn item(url: Url, crawler_id: impl Into<String>, priority: Priority) -> WorkItem {
        WorkItem::new(url, crawler_id, priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn pop_respects_priority_then_fifo() {
        let queue = UrlQueue::new(3);
        queue
            .push(WorkItem::new(url("https://a.example/1"), "c", Priority::LOW))
            .await;
        queue
            .push(WorkItem::new(
                url("https://a.example/2"),
                "c",
                Priority::HIGH,
            ))
            .await;
        queue
            .push(WorkItem::new(
                url("https://a.example/3"),
                "c",
                Priority::HIGH,
            ))
            .await;

        let first = queue.pop().await.unwrap();
        assert_eq!(first.url.path(), "/2");
        let second = queue.pop().await.unwrap();
        assert_eq!(second.url.path(), "/3");
        let third = queue.pop().await.unwrap();
        assert_eq!(third.url.path(), "/1");
    }

    #[tokio::test]
    async fn mark_failed_requeues_until_ceiling() {
        let queue = UrlQueue::new(2);
        let item = WorkItem::new(url("https://a.example/x"), "crawler-a", Priority::NORMAL);
        queue.push(item).await;

        let mut current = queue.pop().await.unwrap();
        assert!(queue.mark_failed(&current, true).await);
        current = queue.pop().await.unwrap();
        assert_eq!(current.retries, 1);
        assert_eq!(current.crawler_id, "crawler-a");

        assert!(queue.mark_failed(&current, true).await);
        current = queue.pop().await.unwrap();
        assert_eq!(current.retries, 2);

        assert!(!queue.mark_failed(&current, true).await);
        assert_eq!(queue.stats().await.dead, 1);
    }

    #[tokio::test]
    async fn mark_processed_records_key() {
        let queue = UrlQueue::new(3);
        let u = url("https://a.example/page?b=2&a=1");
        queue
            .push(WorkItem::new(u.clone(), "c", Priority::NORMAL))
            .await;
        let item = queue.pop().await.unwrap();
        queue.mark_processed(&item.url).await;

        let equivalent = url("https://a.example/page?a=1&b=2");
        assert!(queue.processed_url(&equivalent).await);
    }

    #[tokio::test]
    async fn mark_failed_with_retry_false_is_terminal_immediately() {
        let queue = UrlQueue::new(3);
        let item = WorkItem::new(url("https://a.example/404"), "crawler-a", Priority::NORMAL);
        queue.push(item).await;
        let current = queue.pop().await.unwrap();

        assert!(!queue.mark_failed(&current, false).await);
        assert_eq!(queue.stats().await.dead, 1);
        assert_eq!(queue.stats().await.pending, 0);
    }

    #[tokio::test]
    async fn push_rejects_duplicate_while_still_pending() {
        let queue = UrlQueue::new(3);
        let u = url("https://a.example/dup");
        assert!(
            queue
                .push(WorkItem::new(u.clone(), "c", Priority::NORMAL))
                .await
        );
        assert!(
            !queue
                .push(WorkItem::new(u.clone(), "c", Priority::NORMAL))
                .await
        );

        assert_eq!(queue.size().await, 1);
        assert_eq!(queue.stats().await.pending, 1);
    }

    #[tokio::test]
    async fn push_batch_rejects_duplicate_already_pending_and_within_batch() {
        let queue = UrlQueue::new(3);
        let u = url("https://a.example/batch-dup");
        assert!(
            queue
                .push(WorkItem::new(u.clone(), "c", Priority::NORMAL))
                .await
        );

        let admitted = queue
            .push_batch(vec![
                WorkItem::new(u.clone(), "c", Priority::NORMAL),
                WorkItem::new(u.clone(), "c", Priority::NORMAL),
                WorkItem::new(
                    url("https://a.example/fresh"),
                    "c",
                    Priority::NORMAL,
                ),
            ])
            .await;

        assert_eq!(admitted, 1);
        assert_eq!(queue.size().await, 2);
    }
}
