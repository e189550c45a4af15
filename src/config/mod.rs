// Configuration management module

pub mod crawler;
pub mod environment;
pub mod pipeline;

pub use crawler::{CrawlerSettings, DomainRateLimit, HttpClientFactory, defaults};
pub use environment::{Environment, EnvironmentConfig, LoggingConfig, StorageConfig};
pub use pipeline::PipelineConfig;
