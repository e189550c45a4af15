use serde::{Deserialize, Serialize};

/// Tunables for the pipeline core itself (C1/C2/C4/C5), independent of any
/// one crawler plug-in's own settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub worker_count: usize,
    pub max_demand: usize,
    pub retry_ceiling: u32,
    pub crawled_ttl_seconds: u64,
    pub sweep_interval_ms: u64,
    pub producer_poll_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_demand: 2,
            retry_ceiling: 3,
            crawled_ttl_seconds: 24 * 3600,
            sweep_interval_ms: 3600 * 1000,
            producer_poll_ms: 1000,
        }
    }
}

fn default_worker_count() -> usize {
    let available = num_cpus::get().max(1);
    (available * 2).min(8)
}
