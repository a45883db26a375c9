//! # fedview Core
//!
//! Core types and traits shared by every fedview crate.
//!
//! This crate provides the foundational pieces of federated object resolution:
//!
//! - [`NormalizedIdentifier`] - canonical form of a user-entered URL or `@user@domain` handle
//! - [`FederationObject`] - tagged union of remote objects produced at the fetcher boundary
//! - [`ObjectFetcher`] - the boundary trait implemented by ActivityPub transports
//! - [`FetchError`] - raw transport and parse failures, before classification
//! - [`ResolvedPost`] / [`ResolvedActor`] - normalized records handed to callers
//! - [`emoji`] - custom emoji extraction and idempotent substitution
//!
//! # Architecture
//!
//! ```text
//! raw input ──► identifier::normalize ──► NormalizedIdentifier
//!                                              │
//!                                              ▼
//!                                 ObjectFetcher::lookup (boundary)
//!                                              │
//!                                              ▼
//!                FederationObject::{Post, Actor, Activity, Collection, Other}
//!                                              │
//!                                              ▼
//!                         ResolvedPost + ResolvedActor (+ CustomEmoji)
//! ```

#![doc(html_root_url = "https://docs.rs/fedview-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod emoji;
mod fetch;
pub mod fixtures;
pub mod identifier;
mod model;
mod object;

pub use emoji::{extract_custom_emojis, replace_custom_emojis, DEFAULT_EMOJI_CLASS};
pub use fetch::{FetchError, FetchResult, ObjectFetcher};
pub use identifier::{normalize, IdentifierKind, NormalizedIdentifier, NormalizerRules};
pub use model::{
    Attachment, CustomEmoji, MediaKind, PostWithAuthor, ResolvedActor, ResolvedPost,
};
pub use object::{
    Activity, ActivityKind, ActorObject, CollectionRef, FederationObject, Image, Linked,
    PostObject, Tag, ACTOR_TYPES, POST_TYPES,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extracts the hostname from an absolute URL.
///
/// Returns `None` for relative or unparseable input.
///
/// # Example
///
/// ```
/// use fedview_core::host_of;
///
/// assert_eq!(host_of("https://mastodon.social/@alice/1"), Some("mastodon.social".to_string()));
/// assert_eq!(host_of("not a url"), None);
/// ```
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_duration_millis() {
        use std::time::Duration;
        assert_eq!(duration_millis(Duration::from_secs(2)), 2000);
        assert_eq!(duration_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://floss.social/users/alice/statuses/1"),
            Some("floss.social".to_string())
        );
        assert_eq!(host_of("http://localhost:3000/x"), Some("localhost".to_string()));
        assert_eq!(host_of("@alice@example.com"), None);
        assert_eq!(host_of(""), None);
    }
}
