//! The persistence contract (C6) the pipeline consumes to upsert pages and
//! update site/job counters, plus the two implementations shipped here: an
//! in-memory adapter for tests and a sqlite-backed one for real runs.

pub mod adapter;
pub mod memory_adapter;
pub mod models;
pub mod sqlite_adapter;

pub use adapter::{content_hash, validate_page_attrs, PersistenceAdapter};
pub use memory_adapter::InMemoryAdapter;
pub use models::{
    ActivityEntry, CrawlingStats, Job, JobProgress, JobStatus, NewJob, NewSite, Page, PageAttrs,
    PagedPages, SearchPagesQuery, Site, SiteStats, SiteStatus,
};
pub use sqlite_adapter::SqliteAdapter;
