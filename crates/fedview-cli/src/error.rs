//! Error types for the fedview command-line tool.

use thiserror::Error;

use fedview_core::FetchError;
use fedview_resolver::{ClassifiedError, ResolverError};
use fedview_telemetry::TelemetryError;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Invalid command line.
    #[error("Usage error: {message}")]
    Usage {
        /// Error message.
        message: String,
    },

    /// A resolution failed; the classified error was already reported.
    #[error("Resolution failed: {0}")]
    Resolution(#[from] ClassifiedError),

    /// Resolver setup or search error.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Fetcher setup error.
    #[error("Fetcher error: {0}")]
    Fetch(#[from] FetchError),

    /// Telemetry initialization error.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Get the error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Usage { .. } => "usage",
            Self::Resolution(_) => "resolution",
            Self::Resolver(err) => err.category(),
            Self::Fetch(_) => "fetch",
            Self::Telemetry(_) => "telemetry",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use fedview_resolver::ErrorKind;

    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = CliError::config("chunk_size must be greater than zero");
        assert_eq!(err.category(), "config");
        assert!(err.to_string().contains("Configuration error"));

        let err = CliError::usage("missing <handle>");
        assert_eq!(err.category(), "usage");
    }

    #[test]
    fn test_from_conversions() {
        let err: CliError = ClassifiedError::new(ErrorKind::NotFound, "m.example", "gone").into();
        assert_eq!(err.category(), "resolution");

        let err: CliError = ResolverError::config("search access token is not configured").into();
        assert_eq!(err.category(), "config");
        assert!(err.to_string().contains("access token"));
    }
}
