use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crawl_pipeline_core::core::{Priority, Reason, WorkItem};
use crawl_pipeline_core::queue::UrlQueue;
use crawl_pipeline_core::registry::UrlRegistry;
use std::time::Duration;
use tokio::runtime::Runtime;
use url::Url;

fn runtime() -> Runtime {
    Runtime::new().expect("tokio runtime")
}

/// Benchmark the queue's push/pop hot path (C1), including the dedup check
/// every `push` performs against in-flight and processed sets.
fn benchmark_queue_push_pop(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("queue_push_pop_unique_urls", |b| {
        b.iter(|| {
            rt.block_on(async {
                let queue = UrlQueue::new(3);
                for i in 0..100 {
                    let url = Url::parse(&format!("https://bench.test/{i}")).unwrap();
                    black_box(queue.push(WorkItem::new(url, "ex", Priority::NORMAL)).await);
                }
                for _ in 0..100 {
                    black_box(queue.pop().await);
                }
            })
        })
    });

    c.bench_function("queue_push_duplicate_rejection", |b| {
        b.iter(|| {
            rt.block_on(async {
                let queue = UrlQueue::new(3);
                let url = Url::parse("https://bench.test/dup").unwrap();
                queue
                    .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
                    .await;
                for _ in 0..100 {
                    black_box(
                        queue
                            .push(WorkItem::new(url.clone(), "ex", Priority::NORMAL))
                            .await,
                    );
                }
            })
        })
    });
}

/// Benchmark `mark_failed`'s requeue-vs-ceiling branch (C1/C5 boundary).
fn benchmark_queue_retry_classification(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("queue_mark_failed_until_ceiling", |b| {
        b.iter(|| {
            rt.block_on(async {
                let queue = UrlQueue::new(3);
                let url = Url::parse("https://bench.test/retry").unwrap();
                queue
                    .push(WorkItem::new(url, "ex", Priority::NORMAL))
                    .await;
                let mut item = queue.pop().await.unwrap();
                loop {
                    let requeued = queue.mark_failed(&item, true).await;
                    if !requeued {
                        break;
                    }
                    item = queue.pop().await.unwrap();
                }
                black_box(&item);
            })
        })
    });
}

/// Benchmark the registry's register/lookup hot path (C2).
fn benchmark_registry_register_lookup(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("registry_register_unique_urls", |b| {
        b.iter(|| {
            rt.block_on(async {
                let registry = UrlRegistry::new(Duration::from_secs(3600));
                for i in 0..100 {
                    black_box(registry.register(&format!("https://bench.test/{i}")).await);
                }
            })
        })
    });

    c.bench_function("registry_registered_lookup", |b| {
        b.iter(|| {
            rt.block_on(async {
                let registry = UrlRegistry::new(Duration::from_secs(3600));
                registry.mark_crawled("https://bench.test/x", None).await;
                for _ in 0..100 {
                    black_box(registry.registered("https://bench.test/x").await);
                }
            })
        })
    });
}

/// Benchmark `Reason::should_retry` classification and `from_anyhow_error`
/// categorization, the hot path every worker failure goes through.
fn benchmark_reason_classification(c: &mut Criterion) {
    let timeout_err = anyhow::anyhow!("connection timed out after 30 seconds");
    let reset_err = anyhow::anyhow!("connection reset by peer");

    c.bench_function("reason_should_retry", |b| {
        b.iter(|| {
            black_box(Reason::Timeout.should_retry());
            black_box(Reason::HttpError(404).should_retry());
            black_box(Reason::HttpError(503).should_retry());
        })
    });

    c.bench_function("reason_from_anyhow_error", |b| {
        b.iter(|| {
            black_box(Reason::from_anyhow_error(black_box(&timeout_err)));
            black_box(Reason::from_anyhow_error(black_box(&reset_err)));
        })
    });
}

criterion_group!(
    benches,
    benchmark_queue_push_pop,
    benchmark_queue_retry_classification,
    benchmark_registry_register_lookup,
    benchmark_reason_classification
);
criterion_main!(benches);
