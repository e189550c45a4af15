// URL queue (C1).

pub mod url_queue;

pub use url_queue::UrlQueue;
