//! Observability for fedview.
//!
//! - **Logging**: JSON, pretty or compact output on stderr via `tracing-subscriber`
//! - **Metrics**: Prometheus counters and histograms via the `metrics` crate
//!
//! The resolver crates record through [`metrics`] unconditionally; nothing is
//! exported until the binary calls [`init_telemetry`] with metrics enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use fedview_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let mut config = TelemetryConfig::default();
//! config.logging.level = "fedview_resolver=debug,warn".to_string();
//! config.metrics.enabled = true;
//!
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Validates `config`, then initializes logging and metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    config.validate()?;
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)
}
