//! Failure classification.
//!
//! Raw fetch failures are ambiguous: a refused connection may mean the server
//! is down, or that it has defederated and drops our traffic. The
//! [`FailureClassifier`] turns a raw error and the hostname it came from into
//! a [`ClassifiedError`], probing the host when the error alone cannot tell.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use fedview_core::FetchError;
use fedview_telemetry::metrics::{record_classification, record_probe};

use crate::probe::{HostProbe, ProbeFailure, ProbeOutcome};

/// Why a host could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableReason {
    /// Name resolution failed.
    Dns,
    /// The connection was refused.
    ConnectionRefused,
    /// No more specific cause is known.
    Generic,
}

/// Classified failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The object does not exist (or no longer does).
    NotFound,
    /// The server refused to share the object.
    AccessDenied,
    /// The server could not be reached.
    NetworkUnreachable(UnreachableReason),
    /// The server did not answer in time.
    Timeout,
    /// The server is up but refuses to talk to us.
    FederationBlocked,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::NetworkUnreachable(UnreachableReason::Dns) => "network_unreachable_dns",
            Self::NetworkUnreachable(UnreachableReason::ConnectionRefused) => {
                "network_unreachable_connection_refused"
            }
            Self::NetworkUnreachable(UnreachableReason::Generic) => "network_unreachable",
            Self::Timeout => "timeout",
            Self::FederationBlocked => "federation_blocked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A failure reduced to a stable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} ({hostname}): {detail}")]
pub struct ClassifiedError {
    /// Cause.
    #[serde(flatten)]
    pub kind: ErrorKind,
    /// Host the failure came from.
    pub hostname: String,
    /// The raw error text.
    pub detail: String,
}

impl ClassifiedError {
    /// Creates a classified error.
    pub fn new(kind: ErrorKind, hostname: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            hostname: hostname.into(),
            detail: detail.into(),
        }
    }

    /// A message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        let host = &self.hostname;
        match self.kind {
            ErrorKind::NotFound => {
                format!("This content could not be found on {host}. It may have been deleted.")
            }
            ErrorKind::AccessDenied => format!(
                "{host} refused to share this content. The account may be private or the server may require signed requests."
            ),
            ErrorKind::NetworkUnreachable(UnreachableReason::Dns) => {
                format!("The domain {host} could not be resolved. The server may no longer exist.")
            }
            ErrorKind::NetworkUnreachable(UnreachableReason::ConnectionRefused) => {
                format!("{host} refused the connection. The server appears to be down.")
            }
            ErrorKind::NetworkUnreachable(UnreachableReason::Generic) => {
                format!("{host} could not be reached. The server may be down or unreachable.")
            }
            ErrorKind::Timeout => format!("{host} took too long to respond. Try again later."),
            ErrorKind::FederationBlocked => format!(
                "{host} is not responding to this server. It may have blocked (defederated) it."
            ),
            ErrorKind::Unknown => {
                format!("Something went wrong while fetching from {host}: {}", self.detail)
            }
        }
    }
}

/// Policy for deciding that a host blocks us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingHeuristic {
    /// Hosts known to block requests; subdomains match too.
    pub blocked_hosts: HashSet<String>,
    /// Whether a failed discovery probe implies blocking.
    pub discovery_failure_implies_blocked: bool,
}

impl Default for BlockingHeuristic {
    fn default() -> Self {
        Self {
            blocked_hosts: HashSet::new(),
            discovery_failure_implies_blocked: true,
        }
    }
}

impl BlockingHeuristic {
    /// Creates the default policy with the given known-blocking hosts.
    pub fn with_blocked_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_hosts: hosts
                .into_iter()
                .map(|h| h.into().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            ..Self::default()
        }
    }

    /// Returns true if `host` or one of its parent domains is listed.
    pub fn is_known_blocking(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let mut candidate = host.as_str();
        loop {
            if self.blocked_hosts.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    }
}

/// First-pass category derived from the raw error alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Triage {
    NotFound,
    AccessDenied,
    Timeout,
    Network(Option<UnreachableReason>),
    Unknown,
}

fn triage(error: &FetchError) -> Triage {
    match error {
        FetchError::Status { status: 404 | 410, .. } => Triage::NotFound,
        FetchError::Status { status: 401 | 403, .. } => Triage::AccessDenied,
        FetchError::Status { .. } | FetchError::Parse { .. } => Triage::Unknown,
        FetchError::Timeout { .. } => Triage::Timeout,
        FetchError::Dns { .. } => Triage::Network(Some(UnreachableReason::Dns)),
        FetchError::ConnectionRefused { .. } => {
            Triage::Network(Some(UnreachableReason::ConnectionRefused))
        }
        FetchError::Transport { message } => Triage::Network(reason_from_text(message)),
        FetchError::Other(text) => triage_text(text),
    }
}

fn triage_text(text: &str) -> Triage {
    let lower = text.to_ascii_lowercase();
    let has = |needle: &str| lower.contains(needle);

    let status = status_in_text(text);

    if matches!(status, Some(404 | 410)) || has("not found") {
        Triage::NotFound
    } else if matches!(status, Some(401 | 403)) || has("forbidden") || has("unauthorized") {
        Triage::AccessDenied
    } else if has("timeout") || has("timed out") || has("etimedout") {
        Triage::Timeout
    } else if has("fetch failed")
        || has("network")
        || has("econnrefused")
        || has("enotfound")
        || has("eai_again")
        || has("econnreset")
        || has("socket")
    {
        Triage::Network(reason_from_text(text))
    } else {
        Triage::Unknown
    }
}

/// A 401/403/404/410 standing alone in the text. Digits that are part of a
/// port, an address or a longer number do not count.
fn status_in_text(text: &str) -> Option<u16> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w.:])(40[134]|410)(?:$|[^\w.:]|[.:](?:$|\D))")
            .expect("valid status regex")
    })
    .captures(text)
    .and_then(|caps| caps[1].parse().ok())
}

fn reason_from_text(text: &str) -> Option<UnreachableReason> {
    let upper = text.to_ascii_uppercase();
    if upper.contains("ENOTFOUND") || upper.contains("EAI_AGAIN") || upper.contains("DNS") {
        Some(UnreachableReason::Dns)
    } else if upper.contains("ECONNREFUSED") || upper.contains("CONNECTION REFUSED") {
        Some(UnreachableReason::ConnectionRefused)
    } else {
        None
    }
}

/// Turns raw failures into [`ClassifiedError`]s.
#[derive(Clone)]
pub struct FailureClassifier {
    probe: Arc<dyn HostProbe>,
    heuristic: BlockingHeuristic,
    probe_timeout: Duration,
}

impl fmt::Debug for FailureClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureClassifier")
            .field("heuristic", &self.heuristic)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

impl FailureClassifier {
    /// Creates a classifier.
    pub fn new(
        probe: Arc<dyn HostProbe>,
        heuristic: BlockingHeuristic,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            probe,
            heuristic,
            probe_timeout,
        }
    }

    /// Returns the blocking policy.
    pub fn heuristic(&self) -> &BlockingHeuristic {
        &self.heuristic
    }

    /// Classifies a raw error from `hostname`.
    ///
    /// Not-found, access-denied and timeout errors are classified from the
    /// error alone. Network failures trigger up to two probes.
    pub async fn classify(&self, error: &FetchError, hostname: &str) -> ClassifiedError {
        let detail = error.to_string();
        let kind = match triage(error) {
            Triage::NotFound => ErrorKind::NotFound,
            Triage::AccessDenied => ErrorKind::AccessDenied,
            Triage::Timeout => ErrorKind::Timeout,
            Triage::Unknown => ErrorKind::Unknown,
            Triage::Network(hint) => self.classify_network(hostname, hint).await,
        };

        info!(host = %hostname, kind = %kind, error = %detail, "classified fetch failure");
        record_classification(kind.label());
        ClassifiedError::new(kind, hostname, detail)
    }

    /// Classifies an error known only by its message.
    pub async fn classify_message(&self, message: &str, hostname: &str) -> ClassifiedError {
        self.classify(&FetchError::Other(message.to_string()), hostname)
            .await
    }

    async fn classify_network(&self, host: &str, hint: Option<UnreachableReason>) -> ErrorKind {
        if self.heuristic.is_known_blocking(host) {
            debug!(host = %host, "host is on the known-blocking list");
            return ErrorKind::FederationBlocked;
        }

        if let Err(failure) = self.run_probe(ProbeKind::Discovery, host).await {
            debug!(host = %host, failure = %failure, "discovery probe failed");
            return if self.heuristic.discovery_failure_implies_blocked {
                ErrorKind::FederationBlocked
            } else {
                ErrorKind::NetworkUnreachable(
                    reason_from_probe(&failure)
                        .or(hint)
                        .unwrap_or(UnreachableReason::Generic),
                )
            };
        }

        let reason = match self.run_probe(ProbeKind::Reachability, host).await {
            Ok(()) => hint.unwrap_or(UnreachableReason::Generic),
            Err(failure) => reason_from_probe(&failure).unwrap_or(UnreachableReason::Generic),
        };
        ErrorKind::NetworkUnreachable(reason)
    }

    async fn run_probe(&self, kind: ProbeKind, host: &str) -> ProbeOutcome {
        let probe = async {
            match kind {
                ProbeKind::Discovery => self.probe.discovery(host).await,
                ProbeKind::Reachability => self.probe.reachability(host).await,
            }
        };

        let outcome = tokio::time::timeout(self.probe_timeout, probe)
            .await
            .unwrap_or(Err(ProbeFailure::Timeout));
        record_probe(
            kind.label(),
            outcome.as_ref().map_or_else(ProbeFailure::label, |_| "ok"),
        );
        outcome
    }
}

#[derive(Debug, Clone, Copy)]
enum ProbeKind {
    Discovery,
    Reachability,
}

impl ProbeKind {
    fn label(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Reachability => "reachability",
        }
    }
}

fn reason_from_probe(failure: &ProbeFailure) -> Option<UnreachableReason> {
    match failure {
        ProbeFailure::Dns => Some(UnreachableReason::Dns),
        ProbeFailure::ConnectionRefused => Some(UnreachableReason::ConnectionRefused),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_structured() {
        assert_eq!(triage(&FetchError::status(404, "u")), Triage::NotFound);
        assert_eq!(triage(&FetchError::status(410, "u")), Triage::NotFound);
        assert_eq!(triage(&FetchError::status(401, "u")), Triage::AccessDenied);
        assert_eq!(triage(&FetchError::status(500, "u")), Triage::Unknown);
        assert_eq!(triage(&FetchError::timeout("u", 1)), Triage::Timeout);
        assert_eq!(
            triage(&FetchError::Dns {
                host: "x".to_string()
            }),
            Triage::Network(Some(UnreachableReason::Dns))
        );
        assert_eq!(
            triage(&FetchError::transport("connection reset")),
            Triage::Network(None)
        );
    }

    #[test]
    fn test_triage_text() {
        assert_eq!(triage_text("Request failed with status 404"), Triage::NotFound);
        assert_eq!(triage_text("403 Forbidden"), Triage::AccessDenied);
        assert_eq!(triage_text("operation timed out"), Triage::Timeout);
        assert_eq!(
            triage_text("fetch failed: ECONNREFUSED"),
            Triage::Network(Some(UnreachableReason::ConnectionRefused))
        );
        assert_eq!(
            triage_text("getaddrinfo ENOTFOUND gone.example"),
            Triage::Network(Some(UnreachableReason::Dns))
        );
        assert_eq!(triage_text("unexpected token in JSON"), Triage::Unknown);
    }

    #[test]
    fn test_status_codes_must_stand_alone() {
        assert_eq!(status_in_text("404"), Some(404));
        assert_eq!(status_in_text("HTTP 410: Gone"), Some(410));
        assert_eq!(status_in_text("status code 401."), Some(401));
        assert_eq!(status_in_text("127.0.0.1:4100"), None);
        assert_eq!(status_in_text("listening on :403"), None);
        assert_eq!(status_in_text("10.0.404.1"), None);
        assert_eq!(status_in_text("request 14041 failed"), None);

        assert_eq!(
            triage_text("fetch failed: connect ECONNREFUSED 127.0.0.1:4100"),
            Triage::Network(Some(UnreachableReason::ConnectionRefused))
        );
        assert_eq!(
            triage_text("fetch failed: connect ETIMEDOUT 10.0.0.1:4030"),
            Triage::Timeout
        );
    }

    #[test]
    fn test_known_blocking_matches_subdomains() {
        let heuristic = BlockingHeuristic::with_blocked_hosts(["Blocked.Example", " "]);
        assert!(heuristic.is_known_blocking("blocked.example"));
        assert!(heuristic.is_known_blocking("social.blocked.example"));
        assert!(!heuristic.is_known_blocking("example"));
        assert!(!heuristic.is_known_blocking("notblocked.example"));
        assert_eq!(heuristic.blocked_hosts.len(), 1);
    }

    #[test]
    fn test_user_messages_distinct() {
        let blocked = ClassifiedError::new(ErrorKind::FederationBlocked, "a.example", "x");
        let down = ClassifiedError::new(
            ErrorKind::NetworkUnreachable(UnreachableReason::Generic),
            "a.example",
            "x",
        );
        assert_ne!(blocked.user_message(), down.user_message());
        assert!(blocked.user_message().contains("a.example"));
    }

    #[test]
    fn test_classified_error_json() {
        let err = ClassifiedError::new(ErrorKind::Timeout, "slow.example", "timed out");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["hostname"], "slow.example");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::NetworkUnreachable(
            UnreachableReason::ConnectionRefused,
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"kind":"network_unreachable","reason":"connection_refused"}"#
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotFound).unwrap(),
            r#"{"kind":"not_found"}"#
        );
    }
}
