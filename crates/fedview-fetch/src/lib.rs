//! # fedview Fetch
//!
//! An [`ObjectFetcher`](fedview_core::ObjectFetcher) that speaks plain
//! ActivityStreams JSON over HTTPS.
//!
//! - Objects are requested with `Accept: application/activity+json`
//! - Handles are resolved through WebFinger
//! - Collections are paged lazily through `first`/`next`
//! - Connection failures keep their cause (DNS, refused, timeout)
//!
//! Requests are unsigned and documents are read in compacted form only.
//!
//! # Example
//!
//! ```no_run
//! use fedview_core::ObjectFetcher;
//! use fedview_fetch::{HttpFetcher, HttpFetcherConfig};
//!
//! # async fn example() -> Result<(), fedview_core::FetchError> {
//! let fetcher = HttpFetcher::new(HttpFetcherConfig::default())?;
//! let object = fetcher.lookup("@Gargron@mastodon.social").await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/fedview-fetch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
pub mod document;
pub mod transport;

pub use client::{HttpFetcher, ACTIVITY_ACCEPT, JRD_ACCEPT};
pub use config::{HttpFetcherConfig, DEFAULT_USER_AGENT};
