//! fedview - look at federated posts and accounts from anywhere
//!
//! The `fedview` binary resolves post URLs and account handles from any
//! ActivityPub server and explains, in plain terms, why a fetch failed.
//!
//! # Architecture
//!
//! ```text
//!   argv ──► Args ──► Command ──► App ──► Resolver / BatchResolver / HashtagSearch
//!                                  │
//!   FedviewConfig (file + env) ────┘            JSON lines on stdout
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! # Resolve a post, following elk.zone links
//! $ fedview post https://elk.zone/mastodon.social/@Gargron/1
//!
//! # Six most recent posts of an account
//! $ fedview recent @Gargron@mastodon.social
//!
//! # Resolve everything tagged #rust, five at a time
//! $ FEDVIEW_SEARCH_ACCESS_TOKEN=... fedview hashtag rust --chunked
//! ```

#![doc(html_root_url = "https://docs.rs/fedview-cli/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod args;
pub mod commands;
pub mod config;
pub mod error;

pub use args::{Action, Args, Command, DEFAULT_RECENT_LIMIT};
pub use commands::{App, ErrorRecord};
pub use config::{FedviewConfig, FedviewConfigBuilder};
pub use error::{CliError, CliResult};

/// fedview version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
