//! Error types for the resolver.
//!
//! Per-item resolution failures are never raised through these; they are
//! reported as [`ClassifiedError`](crate::ClassifiedError)s. `ResolverError`
//! covers setup problems and the search client.

use thiserror::Error;

/// Resolver setup and search errors.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// The keyword search request failed.
    #[error("Search error: {message}")]
    Search {
        /// Error message.
        message: String,
        /// HTTP status from the search endpoint, if any.
        status: Option<u16>,
    },

    /// A component could not be constructed.
    #[error("Setup error: {message}")]
    Setup {
        /// Error message.
        message: String,
    },
}

impl ResolverError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a search error.
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search {
            message: message.into(),
            status: None,
        }
    }

    /// Create a search error with the endpoint's status code.
    pub fn search_with_status(message: impl Into<String>, status: u16) -> Self {
        Self::Search {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a setup error.
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Get the error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Search { .. } => "search",
            Self::Setup { .. } => "setup",
        }
    }

    /// Check if retrying could help.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Search { status, .. } => status.map_or(true, |s| s >= 500 || s == 429),
            Self::Config { .. } | Self::Setup { .. } => false,
        }
    }
}

/// Result type for resolver setup and search operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolverError::config("chunk_size must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: chunk_size must be greater than zero"
        );
    }

    #[test]
    fn test_error_category() {
        assert_eq!(ResolverError::config("x").category(), "config");
        assert_eq!(ResolverError::search("x").category(), "search");
        assert_eq!(ResolverError::setup("x").category(), "setup");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ResolverError::search("timeout").is_recoverable());
        assert!(ResolverError::search_with_status("busy", 503).is_recoverable());
        assert!(!ResolverError::search_with_status("bad token", 401).is_recoverable());
        assert!(!ResolverError::config("x").is_recoverable());
    }
}
