//! Runtime configuration for the resolver components.

use std::time::Duration;

use fedview_core::NormalizerRules;

use crate::classify::BlockingHeuristic;
use crate::error::{ResolverError, ResolverResult};

/// Default keyword search endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://floss.social/api/v2/search";

/// Single-object resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Timeout wrapped around every remote fetch.
    pub fetch_timeout: Duration,
    /// Timeout for each classifier probe.
    pub probe_timeout: Duration,
    /// Blocking policy used by the classifier.
    pub heuristic: BlockingHeuristic,
    /// Identifier rewrite rules.
    pub normalizer: NormalizerRules,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            heuristic: BlockingHeuristic::default(),
            normalizer: NormalizerRules::default(),
        }
    }
}

impl ResolverConfig {
    /// Set the per-fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the probe timeout.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the blocking policy.
    #[must_use]
    pub fn with_heuristic(mut self, heuristic: BlockingHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ResolverResult<()> {
        if self.fetch_timeout.is_zero() {
            return Err(ResolverError::config("fetch_timeout must be greater than zero"));
        }
        if self.probe_timeout.is_zero() {
            return Err(ResolverError::config("probe_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Batch resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Identifiers per chunk in chunked mode.
    pub chunk_size: usize,
    /// Pause between chunks.
    pub chunk_pause: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            chunk_pause: Duration::from_millis(500),
        }
    }
}

impl BatchConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ResolverResult<()> {
        if self.chunk_size == 0 {
            return Err(ResolverError::config("chunk_size must be greater than zero"));
        }
        Ok(())
    }
}

/// Keyword search configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Mastodon-compatible `/api/v2/search` endpoint.
    pub endpoint: String,
    /// Bearer token.
    pub access_token: Option<String>,
    /// Maximum number of statuses requested.
    pub limit: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            access_token: None,
            limit: 20,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SearchConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ResolverResult<()> {
        if self
            .access_token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            return Err(ResolverError::config("search access token is not configured"));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ResolverError::config(
                "search endpoint must start with http:// or https://",
            ));
        }
        if self.limit == 0 {
            return Err(ResolverError::config("search limit must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());

        let batch = BatchConfig::default();
        assert_eq!(batch.chunk_size, 5);
        assert_eq!(batch.chunk_pause, Duration::from_millis(500));
    }

    #[test]
    fn test_validation() {
        let config = ResolverConfig::default().with_fetch_timeout(Duration::ZERO);
        assert!(config.validate().is_err());

        let batch = BatchConfig {
            chunk_size: 0,
            ..BatchConfig::default()
        };
        assert!(batch.validate().is_err());
    }

    #[test]
    fn test_search_requires_token() {
        assert!(SearchConfig::default().validate().is_err());

        let config = SearchConfig {
            access_token: Some("secret".to_string()),
            ..SearchConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = SearchConfig {
            access_token: Some("   ".to_string()),
            ..SearchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
