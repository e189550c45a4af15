use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// URL serialization helper, kept at crate scope since several data types
/// carry a raw `url::Url` field across the serde boundary.
pub mod url_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        url.as_str().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Relative ordering of work items within the queue. Wraps a plain `i32`
/// rather than a closed enum so callers can express priorities finer than
/// the five named bands, while still getting the common cases for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(10);
    pub const MEDIUM: Priority = Priority(20);
    pub const HIGH: Priority = Priority(30);
    pub const CRITICAL: Priority = Priority(40);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

/// A unit of work sitting in the queue: a URL plus enough context to run it
/// through the right crawler plug-in and to re-derive its retry position if
/// it fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(with = "url_serde")]
    pub url: Url,
    pub crawler_id: String,
    pub priority: Priority,
    pub retries: u32,
    pub added_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(url: Url, crawler_id: impl Into<String>, priority: Priority) -> Self {
        Self {
            url,
            crawler_id: crawler_id.into(),
            priority,
            retries: 0,
            added_at: Utc::now(),
        }
    }

    /// Build the next attempt of this item: same identity and crawler,
    /// retry counter incremented from the item's own counter. This is the
    /// reconstruction the queue must perform on a retryable failure -- it
    /// must never hard-code a crawler id or reset the counter.
    pub fn next_attempt(&self) -> Self {
        Self {
            url: self.url.clone(),
            crawler_id: self.crawler_id.clone(),
            priority: self.priority,
            retries: self.retries + 1,
            added_at: Utc::now(),
        }
    }
}

/// Queue occupancy snapshot returned by `UrlQueue::stats`. `failed` ticks on
/// every `mark_failed` call (retried or not), matching spec §4.1's
/// "increments `failed`"; `dead` counts only the subset that gave up
/// terminally (non-retryable, or the retry ceiling was exceeded).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub in_flight: u64,
    pub processed: u64,
    pub failed: u64,
    pub dead: u64,
}

/// Content a crawler plug-in extracted from a fetched page, handed to the
/// content-store and link-store helpers by the pipeline after `crawl`
/// returns. Mirrors the `Page` columns the adapter writes, minus the ones
/// only persistence assigns (id, timestamps), plus the links discovered on
/// the same page so the pipeline -- not the plug-in -- drives re-admission
/// through the shared link-store helper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: std::collections::HashMap<String, String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_size: Option<u64>,
    pub discovered_links: Vec<String>,
}
