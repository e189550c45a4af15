use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    CrawlingStats, Job, JobProgress, JobStatus, NewJob, NewSite, Page, PageAttrs, PagedPages,
    SearchPagesQuery, Site, SiteStats,
};

/// The narrow contract the pipeline consumes for page/site/job persistence.
/// Implementations must honor the validation rules noted per-method below;
/// none of them are re-checked by callers in `crawler::contract`.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn get_site_by_url(&self, base_url: &str) -> Result<Option<Site>>;

    async fn create_site(&self, attrs: NewSite) -> Result<Site>;

    /// Insert or replace the page at `attrs.url`, recomputing `content_hash`
    /// from `attrs.content` whenever content is present.
    async fn upsert_page(&self, attrs: PageAttrs) -> Result<Page>;

    async fn create_job(&self, attrs: NewJob) -> Result<Job>;

    /// Set `status = running`, `started_at = now`, and zero the progress
    /// counters.
    async fn start_job(&self, job_id: i64) -> Result<Job>;

    /// Apply a partial update; fields left `None` are unchanged.
    async fn update_job_progress(&self, job_id: i64, progress: JobProgress) -> Result<Job>;

    async fn complete_job(&self, job_id: i64, final_status: JobStatus) -> Result<Job>;

    /// Increment `errors_count` and append `msg` to `error_details`, joined
    /// by a newline with whatever was already recorded.
    async fn add_job_error(&self, job_id: i64, msg: &str) -> Result<Job>;

    async fn list_pages_for_site_paginated(
        &self,
        site_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<PagedPages>;

    async fn search_pages(&self, query: SearchPagesQuery) -> Result<PagedPages>;

    async fn get_crawling_stats(&self) -> Result<CrawlingStats>;

    async fn get_site_stats(&self, site_id: i64) -> Result<SiteStats>;

    async fn get_recent_activity(&self, limit: u32) -> Result<Vec<super::models::ActivityEntry>>;
}

/// `sha256_hex` per spec: lowercase hex digest of the content bytes.
pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Validate a page's adapter-facing attributes before it ever reaches a
/// database: `url` must be an `http(s)` URL with a host, `status_code` must
/// fall in `(0, 600)` if present, and `content_size` is non-negative by
/// construction (`u64`).
pub fn validate_page_attrs(attrs: &PageAttrs) -> Result<()> {
    let parsed = url::Url::parse(&attrs.url)
        .map_err(|e| anyhow::anyhow!("invalid page url '{}': {e}", attrs.url))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("page url '{}' must be http(s)", attrs.url);
    }
    if parsed.host().is_none() {
        anyhow::bail!("page url '{}' must have a host", attrs.url);
    }
    if let Some(code) = attrs.status_code
        && !(1..600).contains(&code)
    {
        anyhow::bail!("status_code {code} out of range (0, 600)");
    }
    Ok(())
}
