//! Batch resolution of many post identifiers.
//!
//! Two modes share the same per-item semantics:
//!
//! - **Streaming**: every identifier runs in its own task and results are
//!   yielded as they settle. A slow or hung item never holds back the others.
//! - **Chunked**: identifiers are resolved a chunk at a time with a pause
//!   in between, which is gentler on remote servers.
//!
//! Per-item failures are reported in the [`BatchItemResult`], never raised.

use std::ops::Range;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::stream::{self, BoxStream, FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use fedview_core::PostWithAuthor;
use fedview_telemetry::metrics::record_batch_item;

use crate::classify::{ClassifiedError, ErrorKind};
use crate::config::BatchConfig;
use crate::error::ResolverResult;
use crate::resolver::{Failure, Resolver};

/// How a single identifier settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The post and its author were resolved.
    Resolved(PostWithAuthor),
    /// The lookup worked but there was nothing usable.
    Unavailable {
        /// What was missing.
        reason: String,
    },
    /// The item failed.
    Failed(ClassifiedError),
}

impl BatchOutcome {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resolved(_) => "resolved",
            Self::Unavailable { .. } => "unavailable",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns the resolved post, if any.
    pub fn resolved(&self) -> Option<&PostWithAuthor> {
        match self {
            Self::Resolved(post) => Some(post),
            _ => None,
        }
    }
}

/// The outcome for one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// The identifier as given.
    pub identifier: String,
    /// How it settled.
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItemResult {
    fn failed_unknown(identifier: String, hostname: String, detail: impl Into<String>) -> Self {
        Self {
            outcome: BatchOutcome::Failed(ClassifiedError::new(
                ErrorKind::Unknown,
                hostname,
                detail,
            )),
            identifier,
        }
    }
}

/// The results of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// Zero-based chunk index.
    pub index: usize,
    /// Position of the chunk's first identifier in the input.
    pub offset: usize,
    /// Results in input order.
    pub results: Vec<BatchItemResult>,
}

/// A dispatched identifier whose result has not been collected yet.
#[derive(Debug)]
pub struct PendingItem {
    identifier: String,
    hostname: String,
    handle: JoinHandle<BatchItemResult>,
}

impl PendingItem {
    /// The identifier as given.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns true once the item has settled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the item; [`settle`](Self::settle) then reports it as failed.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Waits for the item's result.
    pub async fn settle(self) -> BatchItemResult {
        match self.handle.await {
            Ok(result) => result,
            Err(error) => {
                warn!(identifier = %self.identifier, error = %error, "batch item task failed");
                record_batch_item("failed");
                BatchItemResult::failed_unknown(self.identifier, self.hostname, task_failure(&error))
            }
        }
    }
}

/// Resolves many post identifiers concurrently.
#[derive(Debug, Clone)]
pub struct BatchResolver {
    resolver: Arc<Resolver>,
    config: BatchConfig,
}

impl BatchResolver {
    /// Creates a batch resolver.
    pub fn new(resolver: Arc<Resolver>, config: BatchConfig) -> ResolverResult<Self> {
        config.validate()?;
        Ok(Self { resolver, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Starts one task per identifier.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch<I, S>(&self, identifiers: I) -> Vec<PendingItem>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        identifiers
            .into_iter()
            .map(|identifier| {
                let identifier = identifier.into();
                let hostname = self.hostname(&identifier);
                let resolver = Arc::clone(&self.resolver);
                let handle = tokio::spawn(resolve_item(resolver, identifier.clone()));
                PendingItem {
                    identifier,
                    hostname,
                    handle,
                }
            })
            .collect()
    }

    /// Yields results in completion order.
    pub fn stream<I, S>(&self, identifiers: I) -> BoxStream<'static, BatchItemResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending = self.dispatch(identifiers);
        info!(items = pending.len(), "streaming batch resolution");
        pending
            .into_iter()
            .map(PendingItem::settle)
            .collect::<FuturesUnordered<_>>()
            .boxed()
    }

    /// Resolves everything and returns results in input order.
    pub async fn resolve_all<I, S>(&self, identifiers: I) -> Vec<BatchItemResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        join_all(self.dispatch(identifiers).into_iter().map(PendingItem::settle)).await
    }

    /// The index ranges of the chunks for `total` identifiers.
    pub fn chunk_plan(&self, total: usize) -> Vec<Range<usize>> {
        (0..total)
            .step_by(self.config.chunk_size)
            .map(|start| start..total.min(start + self.config.chunk_size))
            .collect()
    }

    /// Resolves one chunk at a time, pausing between chunks.
    ///
    /// A chunk whose task panics is reported with every item failed; later
    /// chunks still run.
    pub fn chunks<I, S>(&self, identifiers: I) -> BoxStream<'static, ChunkReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        let plan = self.chunk_plan(identifiers.len());
        info!(items = identifiers.len(), chunks = plan.len(), "chunked batch resolution");

        let chunks: Vec<(usize, usize, Vec<String>)> = plan
            .into_iter()
            .enumerate()
            .map(|(index, range)| (index, range.start, identifiers[range].to_vec()))
            .collect();
        let resolver = Arc::clone(&self.resolver);
        let pause = self.config.chunk_pause;

        stream::iter(chunks)
            .then(move |(index, offset, chunk)| {
                let resolver = Arc::clone(&resolver);
                async move {
                    if index > 0 && !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    debug!(index, offset, items = chunk.len(), "resolving chunk");

                    let task = tokio::spawn(resolve_chunk(Arc::clone(&resolver), chunk.clone()));
                    let results = match task.await {
                        Ok(results) => results,
                        Err(error) => {
                            warn!(index, error = %error, "chunk task failed");
                            let detail = task_failure(&error);
                            chunk
                                .into_iter()
                                .map(|identifier| {
                                    record_batch_item("failed");
                                    let hostname = hostname_of(&resolver, &identifier);
                                    BatchItemResult::failed_unknown(identifier, hostname, &detail)
                                })
                                .collect()
                        }
                    };
                    ChunkReport {
                        index,
                        offset,
                        results,
                    }
                }
            })
            .boxed()
    }

    fn hostname(&self, identifier: &str) -> String {
        hostname_of(&self.resolver, identifier)
    }
}

async fn resolve_chunk(resolver: Arc<Resolver>, chunk: Vec<String>) -> Vec<BatchItemResult> {
    join_all(
        chunk
            .into_iter()
            .map(|identifier| resolve_item(Arc::clone(&resolver), identifier)),
    )
    .await
}

async fn resolve_item(resolver: Arc<Resolver>, identifier: String) -> BatchItemResult {
    let normalized = resolver.normalize(&identifier);
    let outcome = match resolver.post_with_author(&normalized).await {
        Ok(post) => BatchOutcome::Resolved(post),
        Err(Failure::Unavailable { reason, .. }) => {
            debug!(identifier = %identifier, reason = %reason, "batch item unavailable");
            BatchOutcome::Unavailable { reason }
        }
        Err(failure) => {
            let error = resolver.classify_failure(failure).await;
            warn!(identifier = %identifier, kind = %error.kind, "batch item failed");
            BatchOutcome::Failed(error)
        }
    };
    record_batch_item(outcome.label());
    BatchItemResult {
        identifier,
        outcome,
    }
}

fn hostname_of(resolver: &Resolver, identifier: &str) -> String {
    resolver
        .normalize(identifier)
        .host()
        .unwrap_or_else(|| identifier.to_string())
}

fn task_failure(error: &JoinError) -> String {
    if error.is_cancelled() {
        "resolution was cancelled".to_string()
    } else {
        format!("resolution task panicked: {error}")
    }
}
