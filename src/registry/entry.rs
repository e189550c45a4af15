use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Processing,
    Crawled,
    Failed,
}

/// A single tracked URL: enough to answer "have we seen this" and "what
/// happened to it" without going back to persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub url: String,
    pub status: EntryStatus,
    pub attempts: u32,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl RegistryEntry {
    pub fn new(url: String) -> Self {
        let now = Utc::now();
        Self {
            url,
            status: EntryStatus::Processing,
            attempts: 1,
            registered_at: now,
            updated_at: now,
            expires_at: None,
            last_error: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}
