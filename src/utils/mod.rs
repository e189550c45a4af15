/// Utility functions and helpers
///
/// This module provides common utility functions used across the application,
/// reducing code duplication in main.rs and other modules.
pub mod html;
pub mod logging;

pub use html::{extract_links_from_html, extract_title_from_html};
pub use logging::{init_logging, log_session_summary};
