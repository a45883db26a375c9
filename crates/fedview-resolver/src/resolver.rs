//! Single-object resolution.
//!
//! The [`Resolver`] fetches a post or an account through an
//! [`ObjectFetcher`], dereferences what it links to, and assembles the
//! normalized records. Any raw failure is handed to the
//! [`FailureClassifier`] together with the target host.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use fedview_core::{
    duration_millis, extract_custom_emojis, host_of, ActorObject, FederationObject, FetchError,
    FetchResult, IdentifierKind, NormalizedIdentifier, ObjectFetcher, PostObject, PostWithAuthor,
    ResolvedActor, ResolvedPost,
};
use fedview_telemetry::metrics::record_resolution;

use crate::classify::{ClassifiedError, ErrorKind, FailureClassifier};
use crate::config::ResolverConfig;
use crate::error::ResolverResult;
use crate::probe::HostProbe;

/// The result of [`Resolver::resolve_one`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// A post and its author.
    Post(PostWithAuthor),
    /// An account.
    Profile(ResolvedActor),
}

/// Why a resolution stopped before producing a record.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    /// The lookup worked but there was nothing usable.
    Unavailable { host: String, reason: String },
    /// A fetch failed.
    Fetch { host: String, error: FetchError },
}

impl Failure {
    fn unavailable(host: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    fn fetch(host: &str) -> impl FnOnce(FetchError) -> Self + '_ {
        move |error| Self::Fetch {
            host: host.to_string(),
            error,
        }
    }
}

/// Resolves posts and accounts into normalized records.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn ObjectFetcher>,
    classifier: FailureClassifier,
    config: ResolverConfig,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a resolver.
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        probe: Arc<dyn HostProbe>,
        config: ResolverConfig,
    ) -> ResolverResult<Self> {
        config.validate()?;
        let classifier =
            FailureClassifier::new(probe, config.heuristic.clone(), config.probe_timeout);
        Ok(Self {
            fetcher,
            classifier,
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the failure classifier.
    pub fn classifier(&self) -> &FailureClassifier {
        &self.classifier
    }

    pub(crate) fn fetcher(&self) -> &dyn ObjectFetcher {
        self.fetcher.as_ref()
    }

    /// Normalizes raw input with the configured rules.
    pub fn normalize(&self, raw: &str) -> NormalizedIdentifier {
        self.config.normalizer.normalize(raw)
    }

    /// Resolves a post URL to a post or a handle to a profile.
    pub async fn resolve_one(
        &self,
        identifier: &NormalizedIdentifier,
    ) -> Result<Resolution, ClassifiedError> {
        match identifier.kind {
            IdentifierKind::PostUrl => self.resolve_post(identifier).await.map(Resolution::Post),
            IdentifierKind::Handle => self
                .resolve_profile(identifier)
                .await
                .map(Resolution::Profile),
        }
    }

    /// Resolves a post and its author.
    pub async fn resolve_post(
        &self,
        identifier: &NormalizedIdentifier,
    ) -> Result<PostWithAuthor, ClassifiedError> {
        let started = Instant::now();
        info!(identifier = %identifier, "resolving post");

        let result = match self.post_with_author(identifier).await {
            Ok(resolved) => Ok(resolved),
            Err(failure) => Err(self.classify_failure(failure).await),
        };
        finish("post", identifier, &result, started);
        result
    }

    /// Resolves an account by handle, including its collection totals.
    pub async fn resolve_profile(
        &self,
        identifier: &NormalizedIdentifier,
    ) -> Result<ResolvedActor, ClassifiedError> {
        let started = Instant::now();
        info!(identifier = %identifier, "resolving profile");

        let result = match self.actor_for(identifier, true).await {
            Ok(actor) => Ok(actor),
            Err(failure) => Err(self.classify_failure(failure).await),
        };
        finish("profile", identifier, &result, started);
        result
    }

    /// Resolves a post without classifying failures.
    pub(crate) async fn post_with_author(
        &self,
        identifier: &NormalizedIdentifier,
    ) -> Result<PostWithAuthor, Failure> {
        let target = identifier.value.as_str();
        let host = identifier.host().unwrap_or_else(|| target.to_string());

        let post = match self
            .timed(target, self.fetcher.lookup(target))
            .await
            .map_err(Failure::fetch(&host))?
        {
            Some(FederationObject::Post(post)) => post,
            Some(other) => {
                return Err(Failure::unavailable(
                    &host,
                    format!("{target} is a {} object, not a post", other.shape()),
                ))
            }
            None => return Err(Failure::unavailable(&host, format!("nothing found at {target}"))),
        };

        // Past the first lookup, failures belong to the hosts that serve the
        // post and its author, not the one the user typed.
        let post_host = host_of(&post.id).unwrap_or_else(|| host.clone());
        let author_url = author_url(&post.id).ok_or_else(|| {
            Failure::unavailable(&post_host, format!("no author can be derived from {}", post.id))
        })?;
        let author_host = host_of(&author_url).unwrap_or_else(|| post_host.clone());
        let resolved = self
            .build_post(post)
            .await
            .map_err(Failure::fetch(&post_host))?;

        debug!(identifier = %identifier, author = %author_url, "fetching author");
        let author = match self
            .timed(&author_url, self.fetcher.lookup(&author_url))
            .await
            .map_err(Failure::fetch(&author_host))?
        {
            Some(FederationObject::Actor(actor)) => actor,
            _ => {
                return Err(Failure::unavailable(
                    &author_host,
                    format!("author {author_url} could not be fetched"),
                ))
            }
        };
        let author = self
            .build_actor(&author, false)
            .await
            .map_err(Failure::fetch(&author_host))?;

        Ok(PostWithAuthor {
            post: resolved,
            author,
        })
    }

    /// Looks up an account and assembles it without classifying failures.
    pub(crate) async fn actor_for(
        &self,
        identifier: &NormalizedIdentifier,
        with_totals: bool,
    ) -> Result<ResolvedActor, Failure> {
        let target = identifier.value.as_str();
        let host = identifier.host().unwrap_or_else(|| target.to_string());

        let actor = match self
            .timed(target, self.fetcher.lookup(target))
            .await
            .map_err(Failure::fetch(&host))?
        {
            Some(FederationObject::Actor(actor)) => actor,
            Some(other) => {
                return Err(Failure::unavailable(
                    &host,
                    format!("{target} is a {} object, not an account", other.shape()),
                ))
            }
            None => return Err(Failure::unavailable(&host, format!("nothing found at {target}"))),
        };

        self.build_actor(&actor, with_totals)
            .await
            .map_err(Failure::fetch(&host))
    }

    /// Collects a post's tags and attachments and assembles the record.
    pub(crate) async fn build_post(&self, post: PostObject) -> FetchResult<ResolvedPost> {
        let (tags, attachments) = tokio::try_join!(
            self.timed(&post.id, self.fetcher.tags(&post.tags).try_collect::<Vec<_>>()),
            self.timed(
                &post.id,
                self.fetcher
                    .attachments(&post.attachments)
                    .try_collect::<Vec<_>>()
            ),
        )?;

        Ok(ResolvedPost {
            emojis: extract_custom_emojis(&tags),
            canonical_url: post.url.or_else(|| Some(post.id.clone())),
            content_html: post.content.unwrap_or_default(),
            published_at: post.published,
            attachments,
            id: post.id,
        })
    }

    /// Fetches an actor's icon and tags (and optionally its collection
    /// totals) and assembles the record.
    pub(crate) async fn build_actor(
        &self,
        actor: &ActorObject,
        with_totals: bool,
    ) -> FetchResult<ResolvedActor> {
        let icon = async {
            match self.timed(&actor.id, self.fetcher.icon(actor)).await {
                Ok(icon) => icon,
                Err(error) => {
                    warn!(actor = %actor.id, error = %error, "could not fetch avatar");
                    None
                }
            }
        };
        let tags = self.timed(&actor.id, self.fetcher.tags(&actor.tags).try_collect::<Vec<_>>());
        let totals = async {
            if !with_totals {
                return (None, None, None);
            }
            tokio::join!(
                self.total(actor.followers.as_deref()),
                self.total(actor.following.as_deref()),
                self.total(actor.outbox.as_deref()),
            )
        };

        let (icon, tags, (followers, following, outbox)) = tokio::join!(icon, tags, totals);
        let tags = tags?;

        let preferred_username = actor
            .preferred_username
            .clone()
            .or_else(|| last_segment(&actor.id))
            .unwrap_or_default();
        let display_name = actor
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| preferred_username.clone());

        Ok(ResolvedActor {
            id: actor.id.clone(),
            display_name,
            preferred_username,
            profile_url: actor.url.clone(),
            avatar_url: icon.map(|image| image.url),
            summary_html: actor.summary.clone(),
            emojis: extract_custom_emojis(&tags),
            followers_count: followers,
            following_count: following,
            outbox_count: outbox,
            joined_at: actor.published,
        })
    }

    async fn total(&self, collection: Option<&str>) -> Option<u64> {
        let id = collection?;
        match self.timed(id, self.fetcher.collection_total(id)).await {
            Ok(total) => total,
            Err(error) => {
                warn!(collection = %id, error = %error, "could not fetch collection total");
                None
            }
        }
    }

    /// Runs a fetch under the per-fetch timeout.
    pub(crate) async fn timed<T, F>(&self, target: &str, fetch: F) -> FetchResult<T>
    where
        F: Future<Output = FetchResult<T>>,
    {
        let limit = self.config.fetch_timeout;
        tokio::time::timeout(limit, fetch)
            .await
            .unwrap_or_else(|_| Err(FetchError::timeout(target, duration_millis(limit))))
    }

    /// Turns an internal failure into a classified error.
    pub(crate) async fn classify_failure(&self, failure: Failure) -> ClassifiedError {
        match failure {
            Failure::Unavailable { host, reason } => {
                info!(host = %host, reason = %reason, "nothing usable to resolve");
                ClassifiedError::new(ErrorKind::NotFound, host, reason)
            }
            Failure::Fetch { host, error } => self.classifier.classify(&error, &host).await,
        }
    }
}

fn finish<T>(
    operation: &str,
    identifier: &NormalizedIdentifier,
    result: &Result<T, ClassifiedError>,
    started: Instant,
) {
    let elapsed = started.elapsed();
    let outcome = match result {
        Ok(_) => "ok",
        Err(error) => error.kind.label(),
    };
    info!(
        identifier = %identifier,
        outcome,
        duration_ms = duration_millis(elapsed),
        "{operation} resolution finished"
    );
    record_resolution(operation, outcome, elapsed);
}

/// Derives the author's actor URL from a post id.
///
/// `https://host/users/alice/statuses/1` gives `https://host/users/alice`.
pub fn author_url(post_id: &str) -> Option<String> {
    let url = Url::parse(post_id).ok()?;
    url.host_str()?;
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "users")?;
    let name = segments.next().filter(|name| !name.is_empty())?;
    Some(format!(
        "{}/users/{name}",
        url.origin().ascii_serialization()
    ))
}

fn last_segment(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
