// Core types, traits, and error handling shared by every pipeline component.

pub mod error;
pub mod traits;
pub mod types;
pub mod utils;

pub use error::{PipelineError, Reason};
pub use traits::{
    ContentProcessor, DnsResolver, ErrorHandler, HttpClientManager, Normalizable, RateLimiter,
    RobotsChecker,
};
pub use types::{Priority, QueueStats, WorkItem};
pub use utils::UrlUtils;
