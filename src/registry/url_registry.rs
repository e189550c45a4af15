use crate::core::UrlUtils;
use crate::registry::entry::{EntryStatus, RegistryEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Registry occupancy snapshot.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub processing: u64,
    pub crawled: u64,
    pub failed: u64,
}

fn key(url: &str) -> String {
    UrlUtils::normalize(url)
}

/// URL deduplication registry (C2). Tracks whether a URL has been seen,
/// and in what state, independent of the work queue -- a URL can be
/// registered long after it leaves the queue (e.g. once crawled) and stay
/// tracked for its TTL so it is not re-enqueued.
pub struct UrlRegistry {
    entries: Arc<RwLock<HashMap<String, RegistryEntry>>>,
    default_crawled_ttl: Duration,
}

impl UrlRegistry {
    pub fn new(default_crawled_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_crawled_ttl,
        }
    }

    /// Register a URL as now being processed. No-op (returns `false`) if
    /// it is already registered and not expired. Increments `attempts`
    /// whether this creates a fresh entry or replaces an expired one.
    pub async fn register(&self, url: &str) -> bool {
        let k = key(url);
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(&k) {
            if !existing.is_expired(Utc::now()) {
                return false;
            }
            let attempts = existing.attempts + 1;
            let mut fresh = RegistryEntry::new(url.to_string());
            fresh.attempts = attempts;
            entries.insert(k, fresh);
        } else {
            entries.insert(k, RegistryEntry::new(url.to_string()));
        }
        true
    }

    /// Mark a URL as successfully crawled. `ttl` overrides the registry's
    /// default TTL for this entry only. Shorthand for `register(url,
    /// crawled, ttl)`, so it increments `attempts` like any other
    /// transition.
    pub async fn mark_crawled(&self, url: &str, ttl: Option<Duration>) {
        let k = key(url);
        let now = Utc::now();
        let ttl = ttl.unwrap_or(self.default_crawled_ttl);

        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(k)
            .or_insert_with(|| RegistryEntry::new(url.to_string()));
        entry.status = EntryStatus::Crawled;
        entry.attempts += 1;
        entry.updated_at = now;
        entry.expires_at = Some(now + chrono::Duration::from_std(ttl).unwrap_or_default());
        entry.last_error = None;
    }

    /// Mark a URL as permanently failed (retry ceiling exceeded, or a
    /// non-retryable reason). Failed entries never expire on their own --
    /// only `clear`/explicit re-registration removes them, since a
    /// permanent failure should not silently become eligible for re-crawl.
    pub async fn mark_failed(&self, url: &str, error: Option<&str>) {
        let k = key(url);
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(k)
            .or_insert_with(|| RegistryEntry::new(url.to_string()));
        entry.status = EntryStatus::Failed;
        entry.attempts += 1;
        entry.updated_at = now;
        entry.expires_at = None;
        entry.last_error = error.map(|e| e.to_string());
    }

    /// Release a URL from the `processing` state without a terminal
    /// outcome (the pipeline gave up on it without classifying a reason).
    /// This transitions the entry to `crawled` under the registry's
    /// default TTL rather than leaving it pinned forever -- a permanent,
    /// TTL-less `crawled` entry would never become eligible for re-crawl,
    /// which no other terminal transition in this registry does.
    pub async fn unregister_processing(&self, url: &str) {
        self.mark_crawled(url, None).await;
    }

    pub async fn registered(&self, url: &str) -> bool {
        let k = key(url);
        let entries = self.entries.read().await;
        entries
            .get(&k)
            .is_some_and(|entry| !entry.is_expired(Utc::now()))
    }

    pub async fn get_status(&self, url: &str) -> Option<EntryStatus> {
        self.entries.read().await.get(&key(url)).map(|e| e.status)
    }

    pub async fn get_entry(&self, url: &str) -> Option<RegistryEntry> {
        self.entries.read().await.get(&key(url)).cloned()
    }

    pub async fn stats(&self) -> RegistryStats {
        let entries = self.entries.read().await;
        let mut stats = RegistryStats::default();
        for entry in entries.values() {
            match entry.status {
                EntryStatus::Processing => stats.processing += 1,
                EntryStatus::Crawled => stats.crawled += 1,
                EntryStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn list_by_status(&self, status: EntryStatus) -> Vec<RegistryEntry> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    /// Remove expired entries. Called both on demand and from the
    /// periodic sweep task.
    pub async fn cleanup_expired(&self) -> usize {
        let now: DateTime<Utc> = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Spawn the recurring sweep task that evicts expired entries on the
    /// configured cadence, stopping when `token` is cancelled.
    pub fn spawn_sweep(self: &Arc<Self>, interval: Duration, token: CancellationToken) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("registry sweep task shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = registry.cleanup_expired().await;
                        if removed > 0 {
                            debug!(removed, "registry sweep evicted expired entries");
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_duplicate_is_rejected() {
        let registry = UrlRegistry::new(Duration::from_secs(3600));
        assert!(registry.register("https://a.example/1").await);
        assert!(!registry.register("https://a.example/1").await);
    }

    #[tokio::test]
    async fn crawled_entries_expire() {
        let registry = UrlRegistry::new(Duration::from_millis(10));
        registry.mark_crawled("https://a.example/1", None).await;
        assert!(registry.registered("https://a.example/1").await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!registry.registered("https://a.example/1").await);

        let removed = registry.cleanup_expired().await;
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn failed_entries_do_not_expire() {
        let registry = UrlRegistry::new(Duration::from_millis(10));
        registry
            .mark_failed("https://a.example/1", Some("Network error: :reset"))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            registry.get_status("https://a.example/1").await,
            Some(EntryStatus::Failed)
        );
        assert_eq!(registry.cleanup_expired().await, 0);

        let entry = registry.get_entry("https://a.example/1").await.unwrap();
        assert_eq!(entry.last_error.as_deref(), Some("Network error: :reset"));
    }
}
