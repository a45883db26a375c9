//! Keyword search for hashtag candidates.
//!
//! A [`SearchProvider`] turns a query into the ids of matching statuses,
//! which are then resolved by the [`BatchResolver`](crate::BatchResolver).

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::SearchConfig;
use crate::error::{ResolverError, ResolverResult};

/// Looks up statuses matching a query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the ids of up to `limit` matching statuses.
    async fn search_statuses(&self, query: &str, limit: usize) -> ResolverResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    statuses: Vec<StatusRef>,
}

#[derive(Debug, Deserialize)]
struct StatusRef {
    uri: Option<String>,
    url: Option<String>,
}

impl SearchResponse {
    /// One link per status: its `uri`, or its `url` when the uri is blank.
    fn links(self) -> Vec<String> {
        let present = |link: Option<String>| link.filter(|l| !l.trim().is_empty());
        self.statuses
            .into_iter()
            .filter_map(|status| present(status.uri).or_else(|| present(status.url)))
            .collect()
    }
}

/// Client for a Mastodon-compatible `/api/v2/search` endpoint.
#[derive(Debug, Clone)]
pub struct MastodonSearch {
    client: Client,
    endpoint: Url,
    access_token: String,
}

impl MastodonSearch {
    /// Creates a client. Fails if no access token is configured.
    pub fn new(config: &SearchConfig) -> ResolverResult<Self> {
        config.validate()?;
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| ResolverError::config("search access token is not configured"))?;
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| ResolverError::config(format!("invalid search endpoint: {e}")))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResolverError::setup(format!("failed to build search client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            access_token,
        })
    }

    fn request_url(&self, query: &str, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "statuses")
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl SearchProvider for MastodonSearch {
    async fn search_statuses(&self, query: &str, limit: usize) -> ResolverResult<Vec<String>> {
        let url = self.request_url(query, limit);
        debug!(endpoint = %self.endpoint, query = %query, limit, "searching statuses");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ResolverError::search(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::search_with_status(
                format!("search endpoint answered {status}"),
                status.as_u16(),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResolverError::search(format!("invalid search response: {e}")))?;

        Ok(body.links())
    }
}

/// Finds candidate posts for a hashtag.
#[derive(Clone)]
pub struct HashtagSearch {
    provider: Arc<dyn SearchProvider>,
    limit: usize,
}

impl std::fmt::Debug for HashtagSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashtagSearch")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl HashtagSearch {
    /// Creates a hashtag search over `provider`.
    pub fn new(provider: Arc<dyn SearchProvider>, limit: usize) -> Self {
        Self { provider, limit }
    }

    /// Returns the ids of posts tagged with `tag` (with or without `#`).
    pub async fn candidates(&self, tag: &str) -> ResolverResult<Vec<String>> {
        let tag = tag.trim();
        let tag = tag.strip_prefix('#').unwrap_or(tag);
        if tag.is_empty() {
            return Err(ResolverError::search("hashtag is empty"));
        }

        let ids = self
            .provider
            .search_statuses(&format!("#{tag}"), self.limit)
            .await?;
        info!(tag = %tag, candidates = ids.len(), "hashtag search finished");
        Ok(ids)
    }
}

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"))
}

/// Returns the distinct hashtags in `content`, lowercased and without `#`.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    hashtag_regex()
        .captures_iter(content)
        .map(|caps| caps[1].to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
