//! HTTP fetcher configuration.

use std::time::Duration;

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("fedview/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`HttpFetcher`](crate::HttpFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFetcherConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Upper bound on pages requested during one traversal.
    pub max_pages: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: 20,
        }
    }
}

impl HttpFetcherConfig {
    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the page limit.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpFetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("fedview/"));
    }

    #[test]
    fn test_builder() {
        let config = HttpFetcherConfig::default()
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test/1.0")
            .with_max_pages(2);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test/1.0");
        assert_eq!(config.max_pages, 2);
    }
}
