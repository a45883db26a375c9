//! Telemetry configuration.

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;
use crate::TelemetryResult;

/// Logging and metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,
    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Checks the filter directive and, when metrics are on, the address.
    pub fn validate(&self) -> TelemetryResult<()> {
        self.logging.validate()?;
        if self.metrics.enabled {
            self.metrics.socket_addr()?;
        }
        Ok(())
    }
}
