// URL registry (C2): TTL-backed dedup tracking independent of the queue.

pub mod entry;
pub mod url_registry;

pub use entry::{EntryStatus, RegistryEntry};
pub use url_registry::{RegistryStats, UrlRegistry};
