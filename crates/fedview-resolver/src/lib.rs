//! # fedview Resolver
//!
//! Resolution of federated posts and accounts, and classification of the ways
//! that can fail.
//!
//! # Architecture
//!
//! ```text
//!   identifier ──► Resolver ──► ObjectFetcher (lookup, tags, attachments, icon)
//!                     │                 │
//!                     │            raw FetchError
//!                     │                 ▼
//!                     │         FailureClassifier ──► HostProbe (discovery, reachability)
//!                     │                 │
//!                     ▼                 ▼
//!             PostWithAuthor      ClassifiedError
//!
//!   hashtag ──► HashtagSearch ──► ids ──► BatchResolver ──► BatchItemResult / ChunkReport
//! ```
//!
//! # Features
//!
//! - **Single objects**: [`Resolver::resolve_post`], [`Resolver::resolve_profile`]
//!   and [`Resolver::resolve_one`]
//! - **Recent posts**: [`Resolver::traverse`] and [`Resolver::resolve_recent`] page
//!   an outbox lazily
//! - **Classification**: [`FailureClassifier`] separates down servers from
//!   servers that block us
//! - **Batches**: [`BatchResolver`] in streaming or chunked mode
//! - **Search**: [`HashtagSearch`] over a [`SearchProvider`]

#![doc(html_root_url = "https://docs.rs/fedview-resolver/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod search;
mod traverse;

pub use batch::{BatchItemResult, BatchOutcome, BatchResolver, ChunkReport, PendingItem};
pub use classify::{
    BlockingHeuristic, ClassifiedError, ErrorKind, FailureClassifier, UnreachableReason,
};
pub use config::{BatchConfig, ResolverConfig, SearchConfig, DEFAULT_SEARCH_ENDPOINT};
pub use error::{ResolverError, ResolverResult};
pub use probe::{HostProbe, HttpProbe, NodeInfoDiscovery, NodeInfoLink, ProbeFailure, ProbeOutcome};
pub use resolver::{author_url, Resolution, Resolver};
pub use search::{extract_hashtags, HashtagSearch, MastodonSearch, SearchProvider};
