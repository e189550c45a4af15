/// URL-level helpers shared by the queue, registry, and crawler contract.
pub struct UrlUtils;

impl UrlUtils {
    /// Surface-level validity check used before a URL is ever queued.
    pub fn is_valid_crawl_url(url: &str) -> bool {
        if let Ok(parsed) = url::Url::parse(url) {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        } else {
            false
        }
    }

    /// Normalize a URL into the canonical key form the registry and queue
    /// compare on: fragment stripped, query parameters sorted, no trailing
    /// slash. Scheme and host casing are left to `url::Url`'s own
    /// normalization.
    pub fn normalize(url: &str) -> String {
        if let Ok(mut parsed) = url::Url::parse(url) {
            parsed.set_fragment(None);

            if let Some(query) = parsed.query() {
                let mut params: Vec<_> = query.split('&').collect();
                params.sort_unstable();
                let joined = params.join("&");
                parsed.set_query(Some(&joined));
            }

            if parsed.path().ends_with('/') && parsed.path().len() > 1 {
                let trimmed = parsed.path().trim_end_matches('/').to_string();
                parsed.set_path(&trimmed);
            }

            parsed.to_string()
        } else {
            url.to_string()
        }
    }

    pub fn extract_domain(url: &str) -> Option<String> {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}
