use thiserror::Error;

/// The reason a crawl attempt did not produce a page, shared across the
/// queue, registry and pipeline so retry classification lives in one place.
#[derive(Debug, Clone, Error)]
pub enum Reason {
    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("http error: {0}")]
    HttpError(u16),

    #[error("browser error: {0}")]
    BrowserError(String),

    #[error("temporary failure: {0}")]
    TemporaryFailure(String),

    #[error("invalid crawler: {0}")]
    InvalidCrawler(String),

    #[error("unexpected return: {0}")]
    UnexpectedReturn(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("{0}")]
    Other(String),
}

impl Reason {
    /// Classify a reason as transient (worth retrying) or permanent, per the
    /// retry table: timeout/network_error/http_error>=500/browser_error/
    /// temporary_failure retry, everything else does not.
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            Reason::Timeout
                | Reason::NetworkError(_)
                | Reason::BrowserError(_)
                | Reason::TemporaryFailure(_)
                | Reason::HttpError(500..=599)
        )
    }

    /// Categorize a generic error surfaced from a crawler plug-in or
    /// persistence call into a `Reason`.
    pub fn from_anyhow_error(error: &anyhow::Error) -> Self {
        let msg = error.to_string();
        let lower = msg.to_lowercase();
        match lower.as_str() {
            s if s.contains("timeout") || s.contains("timed out") => Reason::Timeout,
            s if s.contains("dns")
                || s.contains("connection")
                || s.contains("network")
                || s.contains("reset") =>
            {
                Reason::NetworkError(msg)
            }
            s if s.contains("browser") => Reason::BrowserError(msg),
            _ => Reason::Other(msg),
        }
    }
}

/// Crate-level error type for operations outside the crawl-result path
/// (configuration, persistence wiring, queue-internal invariants).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("queue error: {0}")]
    Queue(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("crawler '{0}' is not registered")]
    UnknownCrawler(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
