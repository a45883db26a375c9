//! Identifier normalization.
//!
//! Users paste all kinds of things: bare hosts, handles with or without the
//! leading `@`, mirror-site links, URLs with a synthetic trailing segment.
//! [`normalize`] turns any of them into a [`NormalizedIdentifier`]. It never
//! fails; unrecognised input is treated as a post URL and left for the fetcher
//! to reject.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a normalized identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// An absolute URL of a single post.
    PostUrl,
    /// An account handle of the form `@user@domain`.
    Handle,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostUrl => write!(f, "post_url"),
            Self::Handle => write!(f, "handle"),
        }
    }
}

/// A canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedIdentifier {
    /// Identifier kind.
    pub kind: IdentifierKind,
    /// Canonical value: an `https://` URL or `@user@domain`.
    pub value: String,
}

impl NormalizedIdentifier {
    /// Creates a post URL identifier without normalizing it.
    pub fn post_url(value: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::PostUrl,
            value: value.into(),
        }
    }

    /// Creates a handle identifier from a user and a domain.
    pub fn handle(user: &str, domain: &str) -> Self {
        Self {
            kind: IdentifierKind::Handle,
            value: format!("@{user}@{domain}"),
        }
    }

    /// Returns true if this is a handle.
    pub fn is_handle(&self) -> bool {
        self.kind == IdentifierKind::Handle
    }

    /// Returns the host this identifier points at.
    ///
    /// For a handle this is the domain part; for a URL, its host.
    pub fn host(&self) -> Option<String> {
        match self.kind {
            IdentifierKind::Handle => self
                .value
                .rsplit_once('@')
                .map(|(_, domain)| domain.to_string()),
            IdentifierKind::PostUrl => crate::host_of(&self.value),
        }
    }
}

impl fmt::Display for NormalizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Site-specific rewrite rules applied during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerRules {
    /// Mirror-site prefixes removed from the front of a URL, e.g. `elk.zone/`.
    pub mirror_prefixes: Vec<String>,
    /// Synthetic trailing segments removed from the end of a URL, e.g. `/0`.
    pub trailing_segments: Vec<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            mirror_prefixes: vec!["elk.zone/".to_string()],
            trailing_segments: vec!["/0".to_string()],
        }
    }
}

fn handle_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@?([^@\s/]+)@([^@\s/]+\.[^@\s/]+)$").expect("valid handle regex")
    })
}

fn profile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([^/\s]+)/(?:@|users/|profile/)([^/\s?#]+)/?$")
            .expect("valid profile regex")
    })
}

impl NormalizerRules {
    /// Normalizes a raw identifier using these rules.
    pub fn normalize(&self, raw: &str) -> NormalizedIdentifier {
        let input = raw.trim();

        if let Some(caps) = handle_regex().captures(input) {
            return NormalizedIdentifier::handle(&caps[1], &caps[2]);
        }

        let repaired = repair_scheme(input);
        let (scheme, mut body) = split_scheme(&repaired);

        for prefix in &self.mirror_prefixes {
            if let Some(stripped) = body.strip_prefix(prefix.as_str()) {
                body = stripped;
                break;
            }
        }
        for segment in &self.trailing_segments {
            if let Some(stripped) = body.strip_suffix(segment.as_str()) {
                body = stripped;
                break;
            }
        }

        if let Some(caps) = profile_regex().captures(body) {
            let host = &caps[1];
            let user = &caps[2];
            return match user.split_once('@') {
                Some((name, remote)) if !name.is_empty() && remote.contains('.') => {
                    NormalizedIdentifier::handle(name, remote)
                }
                _ => NormalizedIdentifier::handle(user, host),
            };
        }

        NormalizedIdentifier::post_url(format!("{scheme}{body}"))
    }
}

/// Normalizes a raw identifier with the default rules.
///
/// # Example
///
/// ```
/// use fedview_core::{normalize, IdentifierKind};
///
/// let id = normalize("alice@mastodon.social");
/// assert_eq!(id.kind, IdentifierKind::Handle);
/// assert_eq!(id.value, "@alice@mastodon.social");
///
/// let id = normalize("elk.zone/mastodon.social/@alice/110");
/// assert_eq!(id.value, "https://mastodon.social/@alice/110");
/// ```
pub fn normalize(raw: &str) -> NormalizedIdentifier {
    NormalizerRules::default().normalize(raw)
}

// "https:/host" happens when a URL is rebuilt from path segments.
fn repair_scheme(input: &str) -> String {
    for scheme in ["https:", "http:"] {
        if let Some(rest) = input.strip_prefix(scheme) {
            if !rest.starts_with("//") {
                return format!("{scheme}//{}", rest.trim_start_matches('/'));
            }
        }
    }
    input.to_string()
}

fn split_scheme(input: &str) -> (&str, &str) {
    for scheme in ["https://", "http://"] {
        if let Some(body) = input.strip_prefix(scheme) {
            return (scheme, body);
        }
    }
    ("https://", input)
}
