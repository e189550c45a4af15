//! `sqlx`-backed `PersistenceAdapter`, grounded on the schema-as-raw-SQL,
//! WAL-mode pattern used for link/page indexing elsewhere in the corpus.
//! Raw queries are used throughout (no `sqlx::query!` macros) so the crate
//! builds without a live database at compile time.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::adapter::{content_hash, validate_page_attrs, PersistenceAdapter};
use super::models::{
    ActivityEntry, CrawlingStats, Job, JobProgress, JobStatus, NewJob, NewSite, Page, PageAttrs,
    PagedPages, SearchPagesQuery, Site, SiteStats, SiteStatus,
};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL UNIQUE,
    crawler_id TEXT NOT NULL,
    config TEXT NOT NULL,
    status TEXT NOT NULL,
    last_crawled_at TEXT,
    pages_count INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    content TEXT,
    content_hash TEXT,
    metadata TEXT NOT NULL,
    status_code INTEGER,
    content_type TEXT,
    content_size INTEGER,
    crawled_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_site_id ON pages(site_id);
CREATE INDEX IF NOT EXISTS idx_pages_crawled_at ON pages(crawled_at);
CREATE INDEX IF NOT EXISTS idx_pages_content_hash ON pages(content_hash);
CREATE INDEX IF NOT EXISTS idx_pages_status_code ON pages(status_code);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    pages_found INTEGER NOT NULL DEFAULT 0,
    errors_count INTEGER NOT NULL DEFAULT 0,
    error_details TEXT,
    config TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_site_id ON jobs(site_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
CREATE INDEX IF NOT EXISTS idx_jobs_started_at ON jobs(started_at);
CREATE INDEX IF NOT EXISTS idx_jobs_completed_at ON jobs(completed_at);
"#;

pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Open (creating if missing) the database at `path`, with foreign keys
    /// and WAL journaling enabled, then run the idempotent schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .context("failed to open sqlite database")?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("failed to initialize schema")?;

        Ok(Self { pool })
    }

    /// Open against an in-process database, useful for tests that still
    /// want to exercise the real SQL path.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("failed to open in-memory sqlite database")?;
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn row_to_site(row: &sqlx::sqlite::SqliteRow) -> Result<Site> {
        let config_json: String = row.try_get("config")?;
        Ok(Site {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            base_url: row.try_get("base_url")?,
            crawler_id: row.try_get("crawler_id")?,
            config: serde_json::from_str(&config_json).unwrap_or_default(),
            status: site_status_from_str(&row.try_get::<String, _>("status")?),
            last_crawled_at: row.try_get("last_crawled_at")?,
            pages_count: row.try_get("pages_count")?,
            errors_count: row.try_get("errors_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_page(row: &sqlx::sqlite::SqliteRow) -> Result<Page> {
        let metadata_json: String = row.try_get("metadata")?;
        let status_code: Option<i64> = row.try_get("status_code")?;
        let content_size: Option<i64> = row.try_get("content_size")?;
        Ok(Page {
            id: row.try_get("id")?,
            site_id: row.try_get("site_id")?,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            content_hash: row.try_get("content_hash")?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            status_code: status_code.map(|v| v as u16),
            content_type: row.try_get("content_type")?,
            content_size: content_size.map(|v| v as u64),
            crawled_at: row.try_get("crawled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job> {
        let config_json: String = row.try_get("config")?;
        Ok(Job {
            id: row.try_get("id")?,
            site_id: row.try_get("site_id")?,
            status: job_status_from_str(&row.try_get::<String, _>("status")?),
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            pages_crawled: row.try_get("pages_crawled")?,
            pages_found: row.try_get("pages_found")?,
            errors_count: row.try_get("errors_count")?,
            error_details: row.try_get("error_details")?,
            config: serde_json::from_str(&config_json).unwrap_or_default(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_job(&self, job_id: i64) -> Result<Job> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("job {job_id} not found"))?;
        Self::row_to_job(&row)
    }
}

fn site_status_to_str(status: SiteStatus) -> &'static str {
    match status {
        SiteStatus::Active => "active",
        SiteStatus::Inactive => "inactive",
        SiteStatus::Paused => "paused",
    }
}

fn site_status_from_str(s: &str) -> SiteStatus {
    match s {
        "inactive" => SiteStatus::Inactive,
        "paused" => SiteStatus::Paused,
        _ => SiteStatus::Active,
    }
}

fn job_status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn job_status_from_str(s: &str) -> JobStatus {
    match s {
        "running" => JobStatus::Running,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        _ => JobStatus::Pending,
    }
}

#[async_trait::async_trait]
impl PersistenceAdapter for SqliteAdapter {
    async fn get_site_by_url(&self, base_url: &str) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE base_url = ?")
            .bind(base_url)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_site).transpose()
    }

    async fn create_site(&self, attrs: NewSite) -> Result<Site> {
        let now: DateTime<Utc> = Utc::now();
        let config_json = serde_json::to_string(&attrs.config)?;
        let id = sqlx::query(
            "INSERT INTO sites (name, base_url, crawler_id, config, status, pages_count, errors_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(&attrs.name)
        .bind(&attrs.base_url)
        .bind(&attrs.crawler_id)
        .bind(&config_json)
        .bind(site_status_to_str(SiteStatus::Active))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to insert site")?
        .last_insert_rowid();

        Ok(Site {
            id,
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
        })
    }

    async fn upsert_page(&self, attrs: PageAttrs) -> Result<Page> {
        validate_page_attrs(&attrs)?;
        let now: DateTime<Utc> = Utc::now();
        let hash = attrs.content.as_deref().map(content_hash);
        let metadata_json = serde_json::to_string(&attrs.metadata)?;

        let existing = sqlx::query("SELECT id, created_at FROM pages WHERE url = ?")
            .bind(&attrs.url)
            .fetch_optional(&self.pool)
            .await?;

        let (id, created_at): (i64, DateTime<Utc>) = if let Some(row) = existing {
            let id: i64 = row.try_get("id")?;
            let created_at: DateTime<Utc> = row.try_get("created_at")?;
            sqlx::query(
                "UPDATE pages SET site_id = ?, title = ?, content = ?, content_hash = ?,
                 metadata = ?, status_code = ?, content_type = ?, content_size = ?,
                 crawled_at = ?, updated_at = ? WHERE id = ?",
            )
            .bind(attrs.site_id)
            .bind(&attrs.title)
            .bind(&attrs.content)
            .bind(&hash)
            .bind(&metadata_json)
            .bind(attrs.status_code.map(|v| v as i64))
            .bind(&attrs.content_type)
            .bind(attrs.content_size.map(|v| v as i64))
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to update page")?;
            (id, created_at)
        } else {
            let id = sqlx::query(
                "INSERT INTO pages (site_id, url, title, content, content_hash, metadata,
                 status_code, content_type, content_size, crawled_at, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(attrs.site_id)
            .bind(&attrs.url)
            .bind(&attrs.title)
            .bind(&attrs.content)
            .bind(&hash)
            .bind(&metadata_json)
            .bind(attrs.status_code.map(|v| v as i64))
            .bind(&attrs.content_type)
            .bind(attrs.content_size.map(|v| v as i64))
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("failed to insert page")?
            .last_insert_rowid();
            (id, now)
        };

        sqlx::query(
            "UPDATE sites SET pages_count = pages_count + 1, last_crawled_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(attrs.site_id)
        .execute(&self.pool)
        .await
        .context("failed to bump site page counter")?;

        Ok(Page {
            id,
            site_id: attrs.site_id,
            url: attrs.url,
            title: attrs.title,
            content: attrs.content,
            content_hash: hash,
            metadata: attrs.metadata,
            status_code: attrs.status_code,
            content_type: attrs.content_type,
            content_size: attrs.content_size,
            crawled_at: now,
            created_at,
            updated_at: now,
        })
    }

    async fn create_job(&self, attrs: NewJob) -> Result<Job> {
        let now: DateTime<Utc> = Utc::now();
        let config_json = serde_json::to_string(&attrs.config)?;
        let id = sqlx::query(
            "INSERT INTO jobs (site_id, status, pages_crawled, pages_found, errors_count, config, created_at, updated_at)
             VALUES (?, ?, 0, 0, 0, ?, ?, ?)",
        )
        .bind(attrs.site_id)
        .bind(job_status_to_str(JobStatus::Pending))
        .bind(&config_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to insert job")?
        .last_insert_rowid();

        Ok(Job {
            id,
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
        })
    }

    async fn start_job(&self, job_id: i64) -> Result<Job> {
        let now: DateTime<Utc> = Utc::now();
        sqlx::query(
            "UPDATE jobs SET status = ?, started_at = ?, pages_crawled = 0, pages_found = 0,
             errors_count = 0, updated_at = ? WHERE id = ?",
        )
        .bind(job_status_to_str(JobStatus::Running))
        .bind(now)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to start job")?;
        self.fetch_job(job_id).await
    }

    async fn update_job_progress(&self, job_id: i64, progress: JobProgress) -> Result<Job> {
        let current = self.fetch_job(job_id).await?;
        let now: DateTime<Utc> = Utc::now();
        sqlx::query(
            "UPDATE jobs SET pages_crawled = ?, pages_found = ?, errors_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(progress.pages_crawled.unwrap_or(current.pages_crawled))
        .bind(progress.pages_found.unwrap_or(current.pages_found))
        .bind(progress.errors_count.unwrap_or(current.errors_count))
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to update job progress")?;
        self.fetch_job(job_id).await
    }

    async fn complete_job(&self, job_id: i64, final_status: JobStatus) -> Result<Job> {
        let now: DateTime<Utc> = Utc::now();
        sqlx::query("UPDATE jobs SET status = ?, completed_at = ?, updated_at = ? WHERE id = ?")
            .bind(job_status_to_str(final_status))
            .bind(now)
            .bind(now)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .context("failed to complete job")?;
        self.fetch_job(job_id).await
    }

    async fn add_job_error(&self, job_id: i64, msg: &str) -> Result<Job> {
        let current = self.fetch_job(job_id).await?;
        let joined = match current.error_details {
            Some(existing) => format!("{existing}\n{msg}"),
            None => msg.to_string(),
        };
        let now: DateTime<Utc> = Utc::now();
        sqlx::query(
            "UPDATE jobs SET errors_count = errors_count + 1, error_details = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&joined)
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("failed to record job error")?;
        self.fetch_job(job_id).await
    }

    async fn list_pages_for_site_paginated(
        &self,
        site_id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<PagedPages> {
        if per_page == 0 {
            anyhow::bail!("per_page must be > 0");
        }
        let offset = (page.saturating_sub(1)) as i64 * per_page as i64;
        let rows = sqlx::query(
            "SELECT * FROM pages WHERE site_id = ? ORDER BY crawled_at DESC LIMIT ? OFFSET ?",
        )
        .bind(site_id)
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(&self.pool)
            .await?;

        let pages = rows
            .iter()
            .map(Self::row_to_page)
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedPages {
            pages,
            page,
            per_page,
            total: total.0,
        })
    }

    async fn search_pages(&self, query: SearchPagesQuery) -> Result<PagedPages> {
        if query.per_page == 0 {
            anyhow::bail!("per_page must be > 0");
        }
        let needle = format!("%{}%", query.query);
        let offset = (query.page.saturating_sub(1)) as i64 * query.per_page as i64;

        let rows = sqlx::query(
            "SELECT * FROM pages WHERE (title LIKE ? OR content LIKE ?)
             AND (? IS NULL OR site_id = ?) ORDER BY crawled_at DESC LIMIT ? OFFSET ?",
        )
        .bind(&needle)
        .bind(&needle)
        .bind(query.site_id)
        .bind(query.site_id)
        .bind(query.per_page as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pages WHERE (title LIKE ? OR content LIKE ?)
             AND (? IS NULL OR site_id = ?)",
        )
        .bind(&needle)
        .bind(&needle)
        .bind(query.site_id)
        .bind(query.site_id)
        .fetch_one(&self.pool)
        .await?;

        let pages = rows
            .iter()
            .map(Self::row_to_page)
            .collect::<Result<Vec<_>>>()?;
        Ok(PagedPages {
            pages,
            page: query.page,
            per_page: query.per_page,
            total: total.0,
        })
    }

    async fn get_crawling_stats(&self) -> Result<CrawlingStats> {
        let total_sites: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sites")
            .fetch_one(&self.pool)
            .await?;
        let total_pages: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        let total_jobs: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        let active_jobs: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = 'running'")
                .fetch_one(&self.pool)
                .await?;
        let pages_last_24h: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pages WHERE crawled_at >= datetime('now', '-1 day')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CrawlingStats {
            total_sites: total_sites.0,
            total_pages: total_pages.0,
            total_jobs: total_jobs.0,
            active_jobs: active_jobs.0,
            pages_last_24h: pages_last_24h.0,
        })
    }

    async fn get_site_stats(&self, site_id: i64) -> Result<SiteStats> {
        let site = self
            .get_site_by_url_by_id(site_id)
            .await?
            .context("site not found")?;
        let avg: (Option<f64>,) =
            sqlx::query_as("SELECT AVG(content_size) FROM pages WHERE site_id = ?")
                .bind(site_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(SiteStats {
            site_id,
            pages_count: site.pages_count,
            errors_count: site.errors_count,
            last_crawled_at: site.last_crawled_at,
            avg_content_size: avg.0,
        })
    }

    async fn get_recent_activity(&self, limit: u32) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            "SELECT site_id, url, status_code, crawled_at FROM pages ORDER BY crawled_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let status_code: Option<i64> = row.try_get("status_code")?;
                Ok(ActivityEntry {
                    site_id: row.try_get("site_id")?,
                    url: row.try_get("url")?,
                    status_code: status_code.map(|v| v as u16),
                    crawled_at: row.try_get("crawled_at")?,
                })
            })
            .collect::<Result<Vec<_>>>()
    }
}

impl SqliteAdapter {
    async fn get_site_by_url_by_id(&self, site_id: i64) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE id = ?")
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_site).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn open_creates_schema_on_a_real_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("pipeline.db");
        let adapter = SqliteAdapter::open(&db_path).await.expect("open");

        let site = adapter
            .create_site(NewSite {
                name: "test".into(),
                base_url: "https://example.com".into(),
                crawler_id: "default".into(),
                config: HashMap::new(),
            })
            .await
            .expect("create_site");
        assert_eq!(site.status, SiteStatus::Active);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn upsert_page_roundtrips_content_hash() {
        let adapter = SqliteAdapter::open_in_memory().await.expect("open");
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

        let reloaded = adapter
            .get_site_by_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.pages_count, 1);
    }

    #[tokio::test]
    async fn job_lifecycle_tracks_progress_and_errors() {
        let adapter = SqliteAdapter::open_in_memory().await.expect("open");
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
        assert_eq!(job.status, JobStatus::Pending);

        let job = adapter.start_job(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);

        let job = adapter
            .update_job_progress(
                job.id,
                JobProgress {
                    pages_crawled: Some(2),
                    pages_found: Some(5),
                    errors_count: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(job.pages_crawled, 2);
        assert_eq!(job.pages_found, 5);

        let job = adapter.add_job_error(job.id, "timeout").await.unwrap();
        assert_eq!(job.errors_count, 1);
        assert_eq!(job.error_details.as_deref(), Some("timeout"));

        let job = adapter.complete_job(job.id, JobStatus::Completed).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
    }
}
