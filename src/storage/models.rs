use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Crawler configuration root, created by external control (CLI/dashboard),
/// consumed by the pipeline only to resolve `crawler_id` and seed runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub crawler_id: String,
    pub config: HashMap<String, String>,
    pub status: SiteStatus,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub pages_count: i64,
    pub errors_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Active,
    Inactive,
    Paused,
}

/// Attributes for creating a `Site`; `id`/counters/timestamps are assigned
/// by the adapter.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub base_url: String,
    pub crawler_id: String,
    pub config: HashMap<String, String>,
}

/// A persisted, crawled page. `url` is globally unique; `content_hash` is
/// recomputed by the adapter on every upsert, never trusted from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub content_hash: Option<String>,
    pub metadata: HashMap<String, String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_size: Option<u64>,
    pub crawled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields a caller supplies to `PersistenceAdapter::upsert_page`;
/// `content_hash` is always derived by the adapter, never accepted here.
#[derive(Debug, Clone, Default)]
pub struct PageAttrs {
    pub site_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: HashMap<String, String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_size: Option<u64>,
}

/// Audit/progress record for one crawl run of a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub site_id: i64,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub pages_crawled: i64,
    pub pages_found: i64,
    pub errors_count: i64,
    pub error_details: Option<String>,
    pub config: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub site_id: i64,
    pub config: HashMap<String, String>,
}

/// Partial update applied by `update_job_progress`; `None` fields are left
/// untouched rather than reset to zero.
#[derive(Debug, Clone, Default)]
pub struct JobProgress {
    pub pages_crawled: Option<i64>,
    pub pages_found: Option<i64>,
    pub errors_count: Option<i64>,
}

/// Crawling throughput snapshot for the dashboard's landing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlingStats {
    pub total_sites: i64,
    pub total_pages: i64,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub pages_last_24h: i64,
}

/// Per-site rollup for the dashboard's site detail view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteStats {
    pub site_id: i64,
    pub pages_count: i64,
    pub errors_count: i64,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub avg_content_size: Option<f64>,
}

/// A single row in the dashboard's recent-activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub site_id: i64,
    pub url: String,
    pub status_code: Option<u16>,
    pub crawled_at: DateTime<Utc>,
}

/// One page of a `list_pages_for_site_paginated`/`search_pages` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagedPages {
    pub pages: Vec<Page>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Search filter for `PersistenceAdapter::search_pages`.
#[derive(Debug, Clone, Default)]
pub struct SearchPagesQuery {
    pub query: String,
    pub site_id: Option<i64>,
    pub page: u32,
    pub per_page: u32,
}
