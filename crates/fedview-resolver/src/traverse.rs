//! Recent posts of an account.
//!
//! Traversal pulls the outbox one item at a time and stops as soon as enough
//! posts were found, so later pages are never requested.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future;
use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use fedview_core::{
    duration_millis, host_of, Activity, FederationObject, FetchResult, NormalizedIdentifier,
    PostWithAuthor, ResolvedPost,
};
use fedview_telemetry::metrics::record_resolution;

use crate::classify::ClassifiedError;
use crate::resolver::{Failure, Resolver};

impl Resolver {
    /// Streams up to `limit` original posts of an account, newest first.
    ///
    /// Resolving the account itself can fail; once the stream is returned,
    /// per-item failures are logged and skipped and a page failure ends it.
    pub async fn traverse<'a>(
        &'a self,
        handle: &NormalizedIdentifier,
        limit: usize,
    ) -> Result<BoxStream<'a, PostWithAuthor>, ClassifiedError> {
        let target = handle.value.as_str();
        let host = handle.host().unwrap_or_else(|| target.to_string());

        let actor = match self.timed(target, self.fetcher().lookup(target)).await {
            Ok(Some(FederationObject::Actor(actor))) => actor,
            Ok(other) => {
                let reason = match other {
                    Some(object) => format!("{target} is a {} object, not an account", object.shape()),
                    None => format!("nothing found at {target}"),
                };
                return Err(self
                    .classify_failure(Failure::Unavailable { host, reason })
                    .await);
            }
            Err(error) => return Err(self.classifier().classify(&error, &host).await),
        };

        if limit == 0 {
            return Ok(stream::empty().boxed());
        }

        let host = host_of(&actor.id).unwrap_or(host);

        let author = match self.build_actor(&actor, false).await {
            Ok(author) => Arc::new(author),
            Err(error) => return Err(self.classifier().classify(&error, &host).await),
        };

        let outbox = match self.timed(&actor.id, self.fetcher().outbox(&actor)).await {
            Ok(Some(outbox)) => outbox,
            Ok(None) => {
                debug!(identifier = %handle, "account has no outbox");
                return Ok(stream::empty().boxed());
            }
            Err(error) => return Err(self.classifier().classify(&error, &host).await),
        };

        debug!(identifier = %handle, outbox = %outbox.id, limit, "traversing outbox");
        let posts = self
            .fetcher()
            .traverse(outbox)
            .take_while(|item| {
                if let Err(error) = item {
                    warn!(error = %error, "outbox page failed, ending traversal");
                }
                future::ready(item.is_ok())
            })
            .filter_map(move |item| {
                let author = Arc::clone(&author);
                async move {
                    let activity = item.ok()?;
                    match self.post_from_activity(&activity).await {
                        Ok(Some(post)) => Some(PostWithAuthor {
                            post,
                            author: author.as_ref().clone(),
                        }),
                        Ok(None) => None,
                        Err(error) => {
                            warn!(
                                activity = activity.id.as_deref().unwrap_or_default(),
                                error = %error,
                                "skipping outbox item"
                            );
                            None
                        }
                    }
                }
            })
            .take(limit);

        Ok(posts.boxed())
    }

    /// Collects up to `limit` recent original posts of an account.
    pub async fn resolve_recent(
        &self,
        handle: &NormalizedIdentifier,
        limit: usize,
    ) -> Result<Vec<PostWithAuthor>, ClassifiedError> {
        let started = Instant::now();
        info!(identifier = %handle, limit, "resolving recent posts");

        let result = match self.traverse(handle, limit).await {
            Ok(posts) => Ok(posts.collect::<Vec<_>>().await),
            Err(error) => Err(error),
        };

        let outcome = result.as_ref().map_or_else(|e| e.kind.label(), |_| "ok");
        info!(
            identifier = %handle,
            outcome,
            count = result.as_ref().map_or(0, Vec::len),
            duration_ms = duration_millis(started.elapsed()),
            "recent resolution finished"
        );
        record_resolution("recent", outcome, started.elapsed());
        result
    }

    /// Returns the post created by `activity`, if it is a `Create` of a post.
    /// Entries listed only by id are fetched first.
    async fn post_from_activity(&self, activity: &Activity) -> FetchResult<Option<ResolvedPost>> {
        let fetched;
        let activity = match activity.id.as_deref() {
            Some(id) if activity.is_link() => {
                match self.timed(id, self.fetcher().lookup(id)).await? {
                    Some(FederationObject::Activity(inner)) => {
                        fetched = inner;
                        &fetched
                    }
                    other => {
                        debug!(
                            entry = id,
                            shape = other.as_ref().map_or("nothing", FederationObject::shape),
                            "outbox link is not an activity, skipping"
                        );
                        return Ok(None);
                    }
                }
            }
            _ => activity,
        };
        if !activity.kind.is_create() {
            return Ok(None);
        }
        let target = activity.id.as_deref().unwrap_or("activity");
        match self
            .timed(target, self.fetcher().activity_object(activity))
            .await?
        {
            Some(FederationObject::Post(post)) => self.build_post(post).await.map(Some),
            _ => Ok(None),
        }
    }
}
