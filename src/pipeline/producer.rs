//! Demand-driven producer (C4): the sole dequeuer of `UrlQueue`, feeding a
//! bounded channel that `pipeline::worker::WorkerPool` drains. The channel's
//! capacity -- not a per-worker signal -- is the demand mechanism: a `send`
//! blocks until a worker frees a slot, so the producer never outruns what
//! the pool can actually hold in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::types::WorkItem;
use crate::queue::UrlQueue;

/// Channel capacity for the producer/worker hand-off, per spec.md §9's
/// "bounded channel of capacity `worker_count × max_demand`".
pub fn channel_capacity(worker_count: usize, max_demand: usize) -> usize {
    (worker_count * max_demand).max(1)
}

/// Pops from `queue` and forwards onto `tx` until `token` is cancelled. On
/// an empty pop it waits `poll_interval` before trying again, matching
/// spec.md §4.4's "arms a timer (default 1s); on timer fire it re-attempts".
pub async fn run(
    queue: Arc<UrlQueue>,
    tx: mpsc::Sender<WorkItem>,
    poll_interval: Duration,
    token: CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            info!("producer shutting down");
            return;
        }

        match queue.pop().await {
            Some(item) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("producer shutting down mid-send");
                        return;
                    }
                    send_result = tx.send(item) => {
                        if send_result.is_err() {
                            info!("producer channel closed, shutting down");
                            return;
                        }
                    }
                }
            }
            None => {
                debug!("queue empty, arming poll timer");
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("producer shutting down during poll wait");
                        return;
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }
}

/// Spawn `run` as its own task, returning the handle so callers can await
/// clean shutdown.
pub fn spawn(
    queue: Arc<UrlQueue>,
    tx: mpsc::Sender<WorkItem>,
    poll_interval: Duration,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(queue, tx, poll_interval, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Priority;
    use url::Url;

    #[tokio::test]
    async fn emits_pushed_items_in_pop_order() {
        let queue = Arc::new(UrlQueue::new(3));
        queue
            .push(WorkItem::new(
                Url::parse("https://a.example/1").unwrap(),
                "c",
                Priority::NORMAL,
            ))
            .await;

        let (tx, mut rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let handle = spawn(queue.clone(), tx, Duration::from_millis(20), token.clone());

        let item = rx.recv().await.unwrap();
        assert_eq!(item.url.path(), "/1");

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_emitting_once_cancelled() {
        let queue = Arc::new(UrlQueue::new(3));
        let (tx, rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        token.cancel();
        let handle = spawn(queue, tx, Duration::from_millis(20), token);
        handle.await.unwrap();
        drop(rx);
    }
}
