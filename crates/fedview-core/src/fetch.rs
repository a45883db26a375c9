//! The remote object fetcher boundary.
//!
//! Transports implement [`ObjectFetcher`]. They perform the network I/O,
//! signing (if any) and JSON-LD handling, and hand back typed
//! [`FederationObject`]s. Errors are returned raw; classification happens
//! further up.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::model::Attachment;
use crate::object::{Activity, ActorObject, CollectionRef, FederationObject, Image, Linked, Tag};

/// Raw fetch failure.
///
/// The display text mirrors what a browser-style fetch layer reports, so the
/// classifier can also work from the message alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The fetch did not complete in time.
    #[error("fetch timed out after {elapsed_ms}ms: {target}")]
    Timeout {
        /// What was being fetched.
        target: String,
        /// Time allowed, in milliseconds.
        elapsed_ms: u64,
    },

    /// Name resolution failed.
    #[error("fetch failed: DNS lookup failed (ENOTFOUND) for {host}")]
    Dns {
        /// Host that failed to resolve.
        host: String,
    },

    /// The TCP connection was refused.
    #[error("fetch failed: connection refused (ECONNREFUSED) by {host}")]
    ConnectionRefused {
        /// Host that refused.
        host: String,
    },

    /// Any other network-level failure.
    #[error("fetch failed: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// The response could not be understood.
    #[error("failed to parse response from {url}: {message}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// An error known only by its message.
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Creates a status error.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Creates a 404 error.
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::status(404, url)
    }

    /// Creates a timeout error.
    pub fn timeout(target: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            target: target.into(),
            elapsed_ms,
        }
    }

    /// Creates a generic transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// HTTP status code, if this is a status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true for network-level failures (no HTTP response).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Dns { .. } | Self::ConnectionRefused { .. } | Self::Transport { .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::Dns { .. } => "dns",
            Self::ConnectionRefused { .. } => "connection_refused",
            Self::Transport { .. } => "transport",
            Self::Parse { .. } => "parse",
            Self::Other(_) => "other",
        }
    }
}

/// Result type for fetcher operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Retrieves and dereferences remote federation objects.
///
/// `Ok(None)` means the lookup completed but there was nothing there; errors
/// are raw transport or parse failures.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetches an object by URL or `@user@domain` handle.
    async fn lookup(&self, target: &str) -> FetchResult<Option<FederationObject>>;

    /// Yields the tags of an object, dereferencing links.
    fn tags<'a>(&'a self, tags: &'a [Linked<Tag>]) -> BoxStream<'a, FetchResult<Tag>>;

    /// Yields the attachments of a post, dereferencing links.
    fn attachments<'a>(
        &'a self,
        attachments: &'a [Linked<Attachment>],
    ) -> BoxStream<'a, FetchResult<Attachment>>;

    /// Fetches an actor's avatar.
    async fn icon(&self, actor: &ActorObject) -> FetchResult<Option<Image>>;

    /// Fetches an actor's outbox reference.
    async fn outbox(&self, actor: &ActorObject) -> FetchResult<Option<CollectionRef>>;

    /// Pages lazily through a collection.
    ///
    /// Pages are requested only as items are pulled. An `Err` item means the
    /// page could not be fetched; the stream ends after it.
    fn traverse<'a>(&'a self, collection: CollectionRef) -> BoxStream<'a, FetchResult<Activity>>;

    /// Returns an activity's payload, dereferencing it if needed.
    async fn activity_object(&self, activity: &Activity) -> FetchResult<Option<FederationObject>> {
        match &activity.object {
            Some(Linked::Embedded(object)) => Ok(Some(object.as_ref().clone())),
            Some(Linked::Link(id)) => self.lookup(id).await,
            None => Ok(None),
        }
    }

    /// Fetches a collection's `totalItems`.
    async fn collection_total(&self, collection_id: &str) -> FetchResult<Option<u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::not_found("https://x.example/a").to_string(),
            "HTTP 404 fetching https://x.example/a"
        );
        let refused = FetchError::ConnectionRefused {
            host: "down.example".to_string(),
        };
        assert!(refused.to_string().contains("ECONNREFUSED"));
        assert!(refused.to_string().starts_with("fetch failed"));
    }

    #[test]
    fn test_error_predicates() {
        assert_eq!(FetchError::status(403, "u").status_code(), Some(403));
        assert!(FetchError::timeout("u", 10).is_timeout());
        assert!(FetchError::transport("reset").is_network());
        assert!(!FetchError::parse("u", "bad json").is_network());
        assert_eq!(FetchError::Other("x".to_string()).category(), "other");
    }
}
