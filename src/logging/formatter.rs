// Simplified log formatting for crawler-specific output
// This is a placeholder for more advanced formatting in the future

/// Custom crawler log formatter placeholder
pub struct CrawlLogFormatter;

impl Default for CrawlLogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlLogFormatter {
    pub fn new() -> Self {
        Self
    }
}

/// JSON log formatter placeholder  
pub struct JsonLogFormatter;

impl Default for JsonLogFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonLogFormatter {
    pub fn new() -> Self {
        Self
    }
}

// In a full implementation, these would implement tracing_subscriber's FormatEvent trait
// For now, we're using the standard tracing_subscriber formatting
