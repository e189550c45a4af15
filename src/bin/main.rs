//! Process entry point: load configuration, open storage, register the
//! reference crawler plug-in for one site, and run the pipeline until
//! Ctrl-C.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use crawl_pipeline_core::{
    config::EnvironmentConfig,
    crawler::{ConfigurableCrawler, CrawlerPlugin, CrawlerRegistry},
    pipeline::{spawn_pipeline, JobContext},
    queue::UrlQueue,
    registry::UrlRegistry,
    storage::{JobStatus, NewJob, NewSite, PersistenceAdapter, SqliteAdapter},
    utils::init_logging,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = load_config()?;
    config.validate()?;

    info!(worker_count = config.pipeline.worker_count, "starting pipeline");

    let storage: Arc<dyn PersistenceAdapter> = Arc::new(
        SqliteAdapter::open(Path::new(
            config
                .storage
                .database_url
                .strip_prefix("sqlite://")
                .unwrap_or(&config.storage.database_url),
        ))
        .await
        .context("opening sqlite storage")?,
    );

    let seed_url = std::env::var("CRAWL_SEED_URL").unwrap_or_else(|_| "https://example.com".to_string());
    let crawler_id = "default".to_string();

    let site = match storage.get_site_by_url(&seed_url).await? {
        Some(site) => site,
        None => {
            storage
                .create_site(NewSite {
                    name: seed_url.clone(),
                    base_url: seed_url.clone(),
                    crawler_id: crawler_id.clone(),
                    config: HashMap::new(),
                })
                .await?
        }
    };

    let job = storage
        .create_job(NewJob {
            site_id: site.id,
            config: HashMap::new(),
        })
        .await?;
    storage.start_job(job.id).await?;

    let seed = Url::parse(&seed_url).context("parsing seed url")?;
    let crawler = Arc::new(
        ConfigurableCrawler::new(site.id, crawler_id.clone(), Some(seed), config.crawler.clone())
            .context("building reference crawler")?,
    );

    let mut crawlers = CrawlerRegistry::new();
    crawlers.register(crawler_id, crawler.clone());
    let crawlers = Arc::new(crawlers);

    let queue = Arc::new(UrlQueue::new(config.pipeline.retry_ceiling));
    let registry = Arc::new(UrlRegistry::new(std::time::Duration::from_secs(
        config.pipeline.crawled_ttl_seconds,
    )));

    let token = CancellationToken::new();
    registry.spawn_sweep(
        std::time::Duration::from_millis(config.pipeline.sweep_interval_ms),
        token.clone(),
    );

    crawler.init(&queue).await?;

    let handles = spawn_pipeline(
        &config.pipeline,
        queue,
        registry,
        storage.clone(),
        crawlers,
        Some(JobContext { job_id: job.id }),
        token.clone(),
    );

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested, draining in-flight work");
    token.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    storage.complete_job(job.id, JobStatus::Completed).await?;
    info!("pipeline stopped cleanly");

    Ok(())
}

fn load_config() -> Result<EnvironmentConfig> {
    match std::env::var("CRAWL_CONFIG_PATH") {
        Ok(path) => EnvironmentConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {path}")),
        Err(_) => Ok(EnvironmentConfig::default()),
    }
}
