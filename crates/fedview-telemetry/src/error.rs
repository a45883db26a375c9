//! Telemetry error types.

use thiserror::Error;

/// Errors raised while setting up logging or metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// The directive as given.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was installed earlier.
    #[error("logging already initialized: {0}")]
    SubscriberInstalled(String),

    /// The metrics listen address does not parse.
    #[error("invalid metrics address '{addr}': {reason}")]
    Address {
        /// The address as given.
        addr: String,
        /// Parser message.
        reason: String,
    },

    /// The Prometheus exporter could not be installed.
    #[error("failed to install metrics exporter: {0}")]
    Exporter(String),

    /// An unknown log format name.
    #[error("unknown log format '{0}' (expected json, pretty or compact)")]
    Format(String),
}

impl TelemetryError {
    /// Short category label.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Filter { .. } | Self::Format(_) => "log_config",
            Self::SubscriberInstalled(_) => "subscriber",
            Self::Address { .. } => "metrics_address",
            Self::Exporter(_) => "exporter",
        }
    }
}
