//! The producer/worker-pool pair (C4 + C5): a demand-driven hand-off from
//! `queue::UrlQueue` to concurrently running crawls, with retry
//! classification and registry/persistence updates on every outcome.

pub mod producer;
pub mod worker;

pub use producer::channel_capacity;
pub use worker::{JobContext, WorkerContext, WorkerPool};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::crawler::registry::CrawlerRegistry;
use crate::queue::UrlQueue;
use crate::registry::UrlRegistry;
use crate::storage::PersistenceAdapter;

/// Wires a producer task and a worker pool together per `PipelineConfig`,
/// returning every spawned task's `JoinHandle` so the caller can await a
/// clean shutdown after cancelling `token`.
pub fn spawn_pipeline(
    config: &PipelineConfig,
    queue: Arc<UrlQueue>,
    registry: Arc<UrlRegistry>,
    storage: Arc<dyn PersistenceAdapter>,
    crawlers: Arc<CrawlerRegistry>,
    job: Option<JobContext>,
    token: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    let capacity = channel_capacity(config.worker_count, config.max_demand);
    let (tx, rx) = mpsc::channel(capacity);

    let producer_handle = producer::spawn(
        queue.clone(),
        tx,
        Duration::from_millis(config.producer_poll_ms),
        token,
    );

    let ctx = WorkerContext {
        queue,
        registry,
        storage,
        crawlers,
        job,
    };
    let pool = WorkerPool::new(config.worker_count, config.max_demand);
    let mut handles = pool.spawn(rx, ctx);
    handles.push(producer_handle);
    handles
}
