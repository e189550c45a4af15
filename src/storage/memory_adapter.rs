use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::adapter::{content_hash, validate_page_attrs, PersistenceAdapter};
use super::models::{
    ActivityEntry, CrawlingStats, Job, JobProgress, JobStatus, NewJob, NewSite, Page, PageAttrs,
    PagedPages, SearchPagesQuery, Site, SiteStats, SiteStatus,
};

/// `HashMap`-backed `PersistenceAdapter`, used by integration tests so the
/// pipeline can run end to end without a real database.
#[derive(Default)]
pub struct InMemoryAdapter {
    sites: RwLock<HashMap<i64, Site>>,
    pages: RwLock<HashMap<String, Page>>,
    jobs: RwLock<HashMap<i64, Job>>,
    next_site_id: AtomicI64,
    next_page_id: AtomicI64,
    next_job_id: AtomicI64,
}

impl InMemoryAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_site_id(&self) -> i64 {
        self.next_site_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn next_page_id(&self) -> i64 {
        self.next_page_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn next_job_id(&self) -> i64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryAdapter {
    async fn get_site_by_url(&self, base_url: &str) -> Result<Option<Site>> {
        Ok(self
            .sites
            .read()
            .await
            .values()
            .find(|s| s.base_url == base_url)
            .cloned())
    }

    async fn create_site(&self, attrs: NewSite) -> Result<Site> {
        let now = Utc::now();
        let site = Site {
            id: self.next_site_id(),
            name: attrs.name,
            base_url: attrs.base_url,
            crawler_id: attrs.crawler_id,
            config: attrs.config,
            status: SiteStatus::Active,
            last_crawled_at: None,
            pages_count: 0,
            errors_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.sites.write().await.insert(site.id, site.clone());
        Ok(site)
    }

    async fn upsert_page(&self, attrs: PageAttrs) -> Result<Page> {
        validate_page_attrs(&attrs)?;
        let now = Utc::now();
        let hash = attrs.content.as_deref().map(content_hash);

        let mut pages = self.pages.write().await;
        let page = if let Some(existing) = pages.get(&attrs.url) {
            Page {
                id: existing.id,
                site_id: attrs.site_id,
                url: attrs.url.clone(),
                title: attrs.title,
                content: attrs.content,
                content_hash: hash,
                metadata: attrs.metadata,
                status_code: attrs.status_code,
                content_type: attrs.content_type,
                content_size: attrs.content_size,
                crawled_at: now,
                created_at: existing.created_at,
                updated_at: now,
            }
        } else {
            Page {
                id: self.next_page_id(),
                site_id: attrs.site_id,
                url: attrs.url.clone(),
                title: attrs.title,
                content: attrs.content,
                content_hash: hash,
                metadata: attrs.metadata,
                status_code: attrs.status_code,
                content_type: attrs.content_type,
                content_size: attrs.content_size,
                crawled_at: now,
                created_at: now,
                updated_at: now,
            }
        };
        pages.insert(attrs.url, page.clone());
        drop(pages);

        if let Some(site) = self.sites.write().await.get_mut(&page.site_id) {
            site.pages_count += 1;
            site.last_crawled_at = Some(now);
            site.updated_at = now;
        }
        Ok(page)
    }

    async fn create_job(&self, attrs: NewJob) -> Result<Job> {
        let now = Utc::now();
        let job = Job {
            id: self.next_job_id(),
            site_id: attrs.site_id,
            status: JobStatus::Pending,
            started_at: None,
            completed_at: None,
            pages_crawled: 0,
            pages_found: 0,
            errors_count: 0,
            error_details: None,
            config: attrs.config,
            created_at: now,
            updated_at: now,
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn start_job(&self, job_id: i64) -> Result<Job> {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("job {job_id} not found"))?;
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.pages_crawled = 0;
        job.pages_found = 0;
        job.errors_count = 0;
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn update_job_progress(&self, job_id: i64, progress: JobProgress) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("job {job_id} not found"))?;
        if let Some(v) = progress.pages_crawled {
            job.pages_crawled = v;
        }
        if let Some(v) = progress.pages_found {
            job.pages_found = v;
        }
        if let Some(v) = progress.errors_count {
            job.errors_count = v;
        }
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn complete_job(&self, job_id: i64, final_status: JobStatus) -> Result<Job> {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("job {job_id} not found"))?;
        job.status = final_status;
        job.completed_at = Some(now);
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn add_job_error(&self, job_id: i64, msg: &str) -> Result<Job> {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("job {job_id} not found"))?;
        job.errors_count += 1;
        job.error_details = Some(match job.error_details.take() {
            Some(existing) => format!("{existing}\n{msg}"),
            None => msg.to_string(),
        });
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn list_pages_for_site_paginated(
        &self,
        site_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<PagedPages> {
        if per_page == 0 {
            bail!("per_page must be > 0");
        }
        let pages = self.pages.read().await;
        let mut matching: Vec<Page> = pages
            .values()
            .filter(|p| p.site_id == site_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.crawled_at.cmp(&a.crawled_at));
        let total = matching.len() as i64;
        let start = (page.saturating_sub(1) as usize) * per_page as usize;
        let windowed = matching.into_iter().skip(start).take(per_page as usize).collect();
        Ok(PagedPages {
            pages: windowed,
            page,
            per_page,
            total,
        })
    }

    async fn search_pages(&self, query: SearchPagesQuery) -> Result<PagedPages> {
        if query.per_page == 0 {
            bail!("per_page must be > 0");
        }
        let needle = query.query.to_lowercase();
        let pages = self.pages.read().await;
        let mut matching: Vec<Page> = pages
            .values()
            .filter(|p| query.site_id.map(|id| id == p.site_id).unwrap_or(true))
            .filter(|p| {
                needle.is_empty()
                    || p.title
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&needle)
                    || p.content
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&needle)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.crawled_at.cmp(&a.crawled_at));
        let total = matching.len() as i64;
        let start = (query.page.saturating_sub(1) as usize) * query.per_page as usize;
        let windowed = matching
            .into_iter()
            .skip(start)
            .take(query.per_page as usize)
            .collect();
        Ok(PagedPages {
            pages: windowed,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn get_crawling_stats(&self) -> Result<CrawlingStats> {
        let sites = self.sites.read().await;
        let pages = self.pages.read().await;
        let jobs = self.jobs.read().await;
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        Ok(CrawlingStats {
            total_sites: sites.len() as i64,
            total_pages: pages.len() as i64,
            total_jobs: jobs.len() as i64,
            active_jobs: jobs
                .values()
                .filter(|j| j.status == JobStatus::Running)
                .count() as i64,
            pages_last_24h: pages.values().filter(|p| p.crawled_at >= cutoff).count() as i64,
        })
    }

    async fn get_site_stats(&self, site_id: i64) -> Result<SiteStats> {
        let sites = self.sites.read().await;
        let pages = self.pages.read().await;
        let site = sites.get(&site_id);
        let site_pages: Vec<&Page> = pages.values().filter(|p| p.site_id == site_id).collect();
        let avg_content_size = if site_pages.is_empty() {
            None
        } else {
            let total: u64 = site_pages.iter().filter_map(|p| p.content_size).sum();
            Some(total as f64 / site_pages.len() as f64)
        };
        Ok(SiteStats {
            site_id,
            pages_count: site_pages.len() as i64,
            errors_count: site.map(|s| s.errors_count).unwrap_or_default(),
            last_crawled_at: site.and_then(|s| s.last_crawled_at),
            avg_content_size,
        })
    }

    async fn get_recent_activity(&self, limit: u32) -> Result<Vec<ActivityEntry>> {
        let pages = self.pages.read().await;
        let mut entries: Vec<ActivityEntry> = pages
            .values()
            .map(|p| ActivityEntry {
                site_id: p.site_id,
                url: p.url.clone(),
                status_code: p.status_code,
                crawled_at: p.crawled_at,
            })
            .collect();
        entries.sort_by(|a, b| b.crawled_at.cmp(&a.crawled_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_page_recomputes_hash_and_bumps_site_counter() {
        let adapter = InMemoryAdapter::new();
        let site = adapter
            .create_site(NewSite {
                name: "test".into(),
                base_url: "https://example.com".into(),
                crawler_id: "default".into(),
                config: HashMap::new(),
            })
            .await
            .unwrap();

        let page = adapter
            .upsert_page(PageAttrs {
                site_id: site.id,
                url: "https://example.com/a".into(),
                content: Some("hello world".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.content_hash, Some(content_hash("hello world")));

        let reloaded = adapter.get_site_by_url("https://example.com").await.unwrap().unwrap();
        assert_eq!(reloaded.pages_count, 1);
    }

    #[tokio::test]
    async fn upsert_page_rejects_non_http_url() {
        let adapter = InMemoryAdapter::new();
        let result = adapter
            .upsert_page(PageAttrs {
                site_id: 1,
                url: "ftp://example.com/a".into(),
                ..Default::default()
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn add_job_error_joins_with_newline() {
        let adapter = InMemoryAdapter::new();
        let site = adapter
            .create_site(NewSite {
                name: "test".into(),
                base_url: "https://example.com".into(),
                crawler_id: "default".into(),
                config: HashMap::new(),
            })
            .await
            .unwrap();
        let job = adapter
            .create_job(NewJob {
                site_id: site.id,
                config: HashMap::new(),
            })
            .await
            .unwrap();
        adapter.add_job_error(job.id, "first").await.unwrap();
        let job = adapter.add_job_error(job.id, "second").await.unwrap();
        assert_eq!(job.error_details.as_deref(), Some("first\nsecond"));
        assert_eq!(job.errors_count, 2);
    }
}
