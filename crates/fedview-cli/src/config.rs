//! Configuration for the fedview command-line tool.
//!
//! Loaded from a TOML or JSON file, then overridden by `FEDVIEW_*`
//! environment variables, then validated.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fedview_core::NormalizerRules;
use fedview_fetch::{HttpFetcherConfig, DEFAULT_USER_AGENT};
use fedview_resolver::{
    BatchConfig, BlockingHeuristic, ResolverConfig, SearchConfig, DEFAULT_SEARCH_ENDPOINT,
};
use fedview_telemetry::{LogConfig, LogFormat, MetricsConfig, TelemetryConfig};

use crate::error::{CliError, CliResult};

/// fedview configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FedviewConfig {
    /// Remote fetch settings.
    pub fetch: FetchSettings,
    /// Failure classifier settings.
    pub classifier: ClassifierSettings,
    /// Batch resolution settings.
    pub batch: BatchSettings,
    /// Keyword search settings.
    pub search: SearchSettings,
    /// Identifier rewrite rules.
    pub normalizer: NormalizerRules,
    /// Logging and metrics settings.
    pub telemetry: TelemetrySettings,
}

impl FedviewConfig {
    /// Create a new configuration builder.
    pub fn builder() -> FedviewConfigBuilder {
        FedviewConfigBuilder::default()
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl Into<PathBuf>) -> CliResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| CliError::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| CliError::config(format!("invalid TOML: {e}"))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| CliError::config(format!("invalid JSON: {e}"))),
            _ => Err(CliError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Environment variables are prefixed with `FEDVIEW_` and use uppercase
    /// `snake_case`. The search token falls back to `MASTODON_ACCESS_TOKEN`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = var("FEDVIEW_FETCH_TIMEOUT") {
            if let Ok(timeout) = humantime_serde::parse_duration(&timeout) {
                self.fetch.timeout = timeout;
            }
        }

        if let Some(timeout) = var("FEDVIEW_PROBE_TIMEOUT") {
            if let Ok(timeout) = humantime_serde::parse_duration(&timeout) {
                self.classifier.probe_timeout = timeout;
            }
        }

        if let Some(user_agent) = var("FEDVIEW_USER_AGENT") {
            self.fetch.user_agent = user_agent;
        }

        if let Some(endpoint) = var("FEDVIEW_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }

        if let Some(token) =
            var("FEDVIEW_SEARCH_ACCESS_TOKEN").or_else(|| var("MASTODON_ACCESS_TOKEN"))
        {
            self.search.access_token = Some(token);
        }

        if let Some(size) = var("FEDVIEW_CHUNK_SIZE") {
            if let Ok(size) = size.parse() {
                self.batch.chunk_size = size;
            }
        }

        if let Some(level) = var("FEDVIEW_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }

        if let Some(format) = var("FEDVIEW_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.telemetry.log_format = format;
            }
        }

        if let Some(addr) = var("FEDVIEW_METRICS_ADDR") {
            self.telemetry.metrics_enabled = true;
            self.telemetry.metrics_addr = addr;
        }

        if let Some(hosts) = var("FEDVIEW_BLOCKED_HOSTS") {
            self.classifier.blocked_hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CliResult<()> {
        if self.fetch.max_pages == 0 {
            return Err(CliError::config("fetch.max_pages must be greater than zero"));
        }

        if !self.search.endpoint.starts_with("http://")
            && !self.search.endpoint.starts_with("https://")
        {
            return Err(CliError::config(
                "search.endpoint must start with http:// or https://",
            ));
        }

        if self.search.limit == 0 {
            return Err(CliError::config("search.limit must be greater than zero"));
        }

        self.resolver_config().validate()?;
        self.batch_config().validate()?;
        self.telemetry_config().validate()?;
        Ok(())
    }

    /// Settings for the HTTP fetcher.
    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig::default()
            .with_timeout(self.fetch.timeout)
            .with_user_agent(self.fetch.user_agent.clone())
            .with_max_pages(self.fetch.max_pages)
    }

    /// Settings for the single-object resolver.
    pub fn resolver_config(&self) -> ResolverConfig {
        let mut heuristic = BlockingHeuristic::with_blocked_hosts(self.classifier.blocked_hosts.clone());
        heuristic.discovery_failure_implies_blocked =
            self.classifier.discovery_failure_implies_blocked;

        ResolverConfig {
            normalizer: self.normalizer.clone(),
            ..ResolverConfig::default()
        }
        .with_fetch_timeout(self.fetch.timeout)
        .with_probe_timeout(self.classifier.probe_timeout)
        .with_heuristic(heuristic)
    }

    /// Settings for batch resolution.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            chunk_size: self.batch.chunk_size,
            chunk_pause: self.batch.chunk_pause,
        }
    }

    /// Settings for the keyword search client.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            endpoint: self.search.endpoint.clone(),
            access_token: self.search.access_token.clone(),
            limit: self.search.limit,
            timeout: self.search.timeout,
        }
    }

    /// Settings for logging and metrics.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: LogConfig {
                level: self.telemetry.log_level.clone(),
                format: self.telemetry.log_format,
                ..LogConfig::default()
            },
            metrics: MetricsConfig {
                enabled: self.telemetry.metrics_enabled,
                addr: self.telemetry.metrics_addr.clone(),
                ..MetricsConfig::default()
            },
        }
    }
}

/// Remote fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Timeout for each remote fetch.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Maximum collection pages requested per traversal.
    pub max_pages: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: 20,
        }
    }
}

/// Failure classifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Timeout for each host probe.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Hosts known to block requests.
    pub blocked_hosts: Vec<String>,
    /// Whether a failed discovery probe means the host blocks us.
    pub discovery_failure_implies_blocked: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            blocked_hosts: Vec::new(),
            discovery_failure_implies_blocked: true,
        }
    }
}

/// Batch resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Identifiers per chunk in chunked mode.
    pub chunk_size: usize,
    /// Pause between chunks.
    #[serde(with = "humantime_serde")]
    pub chunk_pause: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            chunk_pause: Duration::from_millis(500),
        }
    }
}

/// Keyword search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Mastodon-compatible search endpoint.
    pub endpoint: String,
    /// Bearer token for the search endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Maximum number of statuses requested.
    pub limit: usize,
    /// Search request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            access_token: None,
            limit: 20,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Log filter directive.
    pub log_level: String,
    /// Log line format.
    pub log_format: LogFormat,
    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,
    /// Metrics listen address.
    pub metrics_addr: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_addr: "127.0.0.1:9464".to_string(),
        }
    }
}

/// Builder for `FedviewConfig`.
#[derive(Debug, Default)]
pub struct FedviewConfigBuilder {
    config: FedviewConfig,
}

impl FedviewConfigBuilder {
    /// Set the per-fetch timeout.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.timeout = timeout;
        self
    }

    /// Set the probe timeout.
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.classifier.probe_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    /// Add a host known to block requests.
    #[must_use]
    pub fn blocked_host(mut self, host: impl Into<String>) -> Self {
        self.config.classifier.blocked_hosts.push(host.into());
        self
    }

    /// Set the chunk size.
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.batch.chunk_size = size;
        self
    }

    /// Set the pause between chunks.
    #[must_use]
    pub fn chunk_pause(mut self, pause: Duration) -> Self {
        self.config.batch.chunk_pause = pause;
        self
    }

    /// Set the search endpoint.
    #[must_use]
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.search.endpoint = endpoint.into();
        self
    }

    /// Set the search access token.
    #[must_use]
    pub fn search_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.search.access_token = Some(token.into());
        self
    }

    /// Set the log level.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.telemetry.log_level = level.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CliResult<FedviewConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Duration (de)serialization in `"10s"` / `"500ms"` form.
mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        };
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let number = |n: &str| -> Result<u64, String> {
            n.trim()
                .parse()
                .map_err(|_| format!("invalid duration: {s}"))
        };

        if let Some(stripped) = s.strip_suffix("ms") {
            Ok(Duration::from_millis(number(stripped)?))
        } else if let Some(stripped) = s.strip_suffix('s') {
            Ok(Duration::from_secs(number(stripped)?))
        } else if let Some(stripped) = s.strip_suffix('m') {
            Ok(Duration::from_secs(number(stripped)? * 60))
        } else if let Some(stripped) = s.strip_suffix('h') {
            Ok(Duration::from_secs(number(stripped)? * 3600))
        } else {
            // Assume seconds
            Ok(Duration::from_secs(number(s)?))
        }
    }
}
