use crate::config::{CrawlerSettings, PipelineConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration for a pipeline process: which environment it's
/// running as, the pipeline tunables, the reference crawler's settings, and
/// logging/storage wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub environment: Environment,
    pub pipeline: PipelineConfig,
    pub crawler: CrawlerSettings,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            pipeline: PipelineConfig::default(),
            crawler: CrawlerSettings::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
            storage: StorageConfig {
                database_url: "sqlite://crawl_pipeline.db".to_string(),
            },
        }
    }
}

impl EnvironmentConfig {
    /// Load configuration from a TOML file, then apply environment
    /// variable overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let mut config: EnvironmentConfig = toml::from_str(&config_content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(env) = std::env::var("CRAWLER_ENV") {
            self.environment = match env.to_lowercase().as_str() {
                "development" | "dev" => Environment::Development,
                "staging" | "stage" => Environment::Staging,
                "production" | "prod" => Environment::Production,
                _ => self.environment.clone(),
            };
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.storage.database_url = url;
        }

        if let Ok(workers) = std::env::var("PIPELINE_WORKER_COUNT")
            && let Ok(workers) = workers.parse()
        {
            self.pipeline.worker_count = workers;
        }
    }

    /// Validate configuration invariants before the pipeline starts.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.worker_count == 0 {
            return Err(anyhow::anyhow!("worker_count must be > 0"));
        }
        if self.pipeline.max_demand == 0 {
            return Err(anyhow::anyhow!("max_demand must be > 0"));
        }
        if self.storage.database_url.is_empty() {
            return Err(anyhow::anyhow!("database_url must be set"));
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_content = toml::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }
}
