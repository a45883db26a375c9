//! Host probes used by the failure classifier.
//!
//! A *discovery* probe fetches the host's NodeInfo well-known document and
//! tells whether the server answers us at the application level. A
//! *reachability* probe only checks that something answers HTTP on the host
//! at all, and reports how it failed otherwise.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use fedview_core::FetchError;
use fedview_fetch::transport::map_reqwest_error;

use crate::error::{ResolverError, ResolverResult};

/// How a probe failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    /// Name resolution failed.
    #[error("DNS lookup failed")]
    Dns,
    /// The connection was refused.
    #[error("connection refused")]
    ConnectionRefused,
    /// No answer in time.
    #[error("timed out")]
    Timeout,
    /// Non-success HTTP status.
    #[error("HTTP {0}")]
    Status(u16),
    /// The discovery document did not have the expected shape.
    #[error("invalid discovery document: {0}")]
    InvalidDocument(String),
    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl ProbeFailure {
    /// Maps a raw fetch error onto a probe failure.
    pub fn from_fetch_error(error: &FetchError) -> Self {
        match error {
            FetchError::Dns { .. } => Self::Dns,
            FetchError::ConnectionRefused { .. } => Self::ConnectionRefused,
            FetchError::Timeout { .. } => Self::Timeout,
            FetchError::Status { status, .. } => Self::Status(*status),
            FetchError::Parse { message, .. } => Self::InvalidDocument(message.clone()),
            FetchError::Transport { message } => Self::Other(message.clone()),
            FetchError::Other(message) => Self::Other(message.clone()),
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::ConnectionRefused => "connection_refused",
            Self::Timeout => "timeout",
            Self::Status(_) => "status",
            Self::InvalidDocument(_) => "invalid_document",
            Self::Other(_) => "other",
        }
    }
}

/// Result of a probe.
pub type ProbeOutcome = Result<(), ProbeFailure>;

/// Probes a host on behalf of the classifier.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Fetches and validates the host's discovery document.
    async fn discovery(&self, host: &str) -> ProbeOutcome;

    /// Checks that the host answers HTTP at all.
    async fn reachability(&self, host: &str) -> ProbeOutcome;
}

/// The NodeInfo well-known discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfoDiscovery {
    /// Typed links to NodeInfo documents.
    pub links: Vec<NodeInfoLink>,
}

/// A typed link in a discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfoLink {
    /// Schema URI.
    pub rel: String,
    /// Document URL.
    pub href: String,
}

/// Probes hosts over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpProbe {
    /// Creates a probe with the given per-request timeout.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> ResolverResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolverError::setup(format!("failed to create probe client: {e}")))?;

        Ok(Self {
            client,
            user_agent: user_agent.into(),
            timeout,
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProbeFailure> {
        self.client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| ProbeFailure::from_fetch_error(&map_reqwest_error(&e, url, self.timeout)))
    }
}

#[async_trait]
impl HostProbe for HttpProbe {
    async fn discovery(&self, host: &str) -> ProbeOutcome {
        let url = format!("https://{host}/.well-known/nodeinfo");
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeFailure::Status(status.as_u16()));
        }

        let document: NodeInfoDiscovery = response
            .json()
            .await
            .map_err(|e| ProbeFailure::InvalidDocument(e.to_string()))?;
        debug!(host = %host, links = document.links.len(), "discovery document found");
        Ok(())
    }

    async fn reachability(&self, host: &str) -> ProbeOutcome {
        let url = format!("https://{host}/");
        let response = self.get(&url).await?;
        debug!(host = %host, status = response.status().as_u16(), "host reachable");
        Ok(())
    }
}
