//! Test fixtures.
//!
//! [`StaticFetcher`] is an in-memory [`ObjectFetcher`] with scripted failures,
//! delays, hangs and panics. The builder functions produce small, valid
//! objects for tests in this and downstream crates.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::fetch::{FetchError, FetchResult, ObjectFetcher};
use crate::model::{Attachment, MediaKind};
use crate::object::{
    Activity, ActivityKind, ActorObject, CollectionRef, FederationObject, Image, Linked,
    PostObject, Tag,
};

#[derive(Debug, Clone)]
enum Entry {
    Object(FederationObject),
    Failure(FetchError),
}

/// An in-memory fetcher.
///
/// Clones share their call log.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    entries: HashMap<String, Entry>,
    delays: HashMap<String, Duration>,
    hangs: HashSet<String>,
    panics: HashSet<String>,
    outboxes: HashMap<String, Vec<FetchResult<Activity>>>,
    totals: HashMap<String, u64>,
    lookups: Arc<Mutex<Vec<String>>>,
    outbox_requests: Arc<AtomicUsize>,
    pulled: Arc<AtomicUsize>,
}

impl StaticFetcher {
    /// Creates an empty fetcher; every lookup returns `Ok(None)`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `object` for `id`.
    #[must_use]
    pub fn with_object(mut self, id: impl Into<String>, object: FederationObject) -> Self {
        self.entries.insert(id.into(), Entry::Object(object));
        self
    }

    /// Serves a post under its own id.
    #[must_use]
    pub fn with_post(self, post: PostObject) -> Self {
        let id = post.id.clone();
        self.with_object(id, FederationObject::Post(post))
    }

    /// Serves an actor under its own id and, optionally, a handle.
    #[must_use]
    pub fn with_actor(self, actor: ActorObject, handle: Option<&str>) -> Self {
        let id = actor.id.clone();
        let this = self.with_object(id, FederationObject::Actor(actor.clone()));
        match handle {
            Some(handle) => this.with_object(handle, FederationObject::Actor(actor)),
            None => this,
        }
    }

    /// Fails lookups of `id` with `error`.
    #[must_use]
    pub fn with_failure(mut self, id: impl Into<String>, error: FetchError) -> Self {
        self.entries.insert(id.into(), Entry::Failure(error));
        self
    }

    /// Delays lookups of `id`.
    #[must_use]
    pub fn with_delay(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Makes lookups of `id` never complete.
    #[must_use]
    pub fn with_hang(mut self, id: impl Into<String>) -> Self {
        self.hangs.insert(id.into());
        self
    }

    /// Makes lookups of `id` panic.
    #[must_use]
    pub fn with_panic(mut self, id: impl Into<String>) -> Self {
        self.panics.insert(id.into());
        self
    }

    /// Sets the items yielded when traversing collection `id`.
    #[must_use]
    pub fn with_outbox(mut self, id: impl Into<String>, items: Vec<FetchResult<Activity>>) -> Self {
        self.outboxes.insert(id.into(), items);
        self
    }

    /// Sets the `totalItems` of collection `id`.
    #[must_use]
    pub fn with_total(mut self, id: impl Into<String>, total: u64) -> Self {
        self.totals.insert(id.into(), total);
        self
    }

    /// Every target passed to `lookup`, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `outbox` calls.
    pub fn outbox_requests(&self) -> usize {
        self.outbox_requests.load(Ordering::SeqCst)
    }

    /// Number of activities pulled out of traversal streams.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectFetcher for StaticFetcher {
    async fn lookup(&self, target: &str) -> FetchResult<Option<FederationObject>> {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.to_string());

        if self.panics.contains(target) {
            panic!("scripted panic looking up {target}");
        }
        if self.hangs.contains(target) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(target) {
            tokio::time::sleep(*delay).await;
        }

        match self.entries.get(target) {
            Some(Entry::Object(object)) => Ok(Some(object.clone())),
            Some(Entry::Failure(error)) => Err(error.clone()),
            None => Ok(None),
        }
    }

    fn tags<'a>(&'a self, tags: &'a [Linked<Tag>]) -> BoxStream<'a, FetchResult<Tag>> {
        stream::iter(tags.iter().map(|tag| match tag {
            Linked::Embedded(tag) => Ok(tag.clone()),
            Linked::Link(id) => Err(FetchError::not_found(id.clone())),
        }))
        .boxed()
    }

    fn attachments<'a>(
        &'a self,
        attachments: &'a [Linked<Attachment>],
    ) -> BoxStream<'a, FetchResult<Attachment>> {
        stream::iter(attachments.iter().map(|attachment| match attachment {
            Linked::Embedded(attachment) => Ok(attachment.clone()),
            Linked::Link(id) => Err(FetchError::not_found(id.clone())),
        }))
        .boxed()
    }

    async fn icon(&self, actor: &ActorObject) -> FetchResult<Option<Image>> {
        match &actor.icon {
            Some(Linked::Embedded(image)) => Ok(Some(image.clone())),
            Some(Linked::Link(id)) => Err(FetchError::not_found(id.clone())),
            None => Ok(None),
        }
    }

    async fn outbox(&self, actor: &ActorObject) -> FetchResult<Option<CollectionRef>> {
        self.outbox_requests.fetch_add(1, Ordering::SeqCst);
        Ok(actor.outbox.as_ref().map(|id| CollectionRef {
            id: id.clone(),
            total_items: self.totals.get(id).copied(),
        }))
    }

    fn traverse<'a>(&'a self, collection: CollectionRef) -> BoxStream<'a, FetchResult<Activity>> {
        let items = self
            .outboxes
            .get(&collection.id)
            .cloned()
            .unwrap_or_default();
        let pulled = Arc::clone(&self.pulled);
        stream::iter(items)
            .inspect(move |_| {
                pulled.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }

    async fn collection_total(&self, collection_id: &str) -> FetchResult<Option<u64>> {
        if let Some(Entry::Failure(error)) = self.entries.get(collection_id) {
            return Err(error.clone());
        }
        Ok(self.totals.get(collection_id).copied())
    }
}

/// A `Note` with the given id and HTML content.
pub fn note(id: &str, content: &str) -> PostObject {
    PostObject {
        id: id.to_string(),
        object_type: "Note".to_string(),
        content: Some(content.to_string()),
        url: Some(id.to_string()),
        ..PostObject::default()
    }
}

/// A `Person` with the given id and username; its outbox is `{id}/outbox`.
pub fn person(id: &str, username: &str) -> ActorObject {
    ActorObject {
        id: id.to_string(),
        actor_type: "Person".to_string(),
        preferred_username: Some(username.to_string()),
        name: Some(username.to_string()),
        url: Some(id.to_string()),
        outbox: Some(format!("{id}/outbox")),
        followers: Some(format!("{id}/followers")),
        following: Some(format!("{id}/following")),
        ..ActorObject::default()
    }
}

/// A `Create` activity embedding `post`.
pub fn create(post: PostObject) -> Activity {
    Activity::with_object(ActivityKind::Create, FederationObject::Post(post))
}

/// An `Announce` (boost) of `object_id`.
pub fn announce(object_id: &str) -> Activity {
    Activity::with_link(ActivityKind::Announce, object_id)
}

/// An emoji tag.
pub fn emoji_tag(shortcode: &str, image_url: &str) -> Linked<Tag> {
    Linked::Embedded(Tag::Emoji {
        id: None,
        name: shortcode.to_string(),
        icon: Some(Image::new(image_url)),
    })
}

/// An image attachment.
pub fn image_attachment(url: &str, alt_text: Option<&str>) -> Linked<Attachment> {
    Linked::Embedded(Attachment {
        url: url.to_string(),
        alt_text: alt_text.map(str::to_string),
        width: None,
        height: None,
        media_kind: MediaKind::Image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_lookup() {
        let fetcher = StaticFetcher::new()
            .with_post(note("https://a.example/users/x/statuses/1", "hi"))
            .with_failure("https://b.example/1", FetchError::status(403, "https://b.example/1"));

        let found = fetcher
            .lookup("https://a.example/users/x/statuses/1")
            .await
            .unwrap();
        assert!(matches!(found, Some(FederationObject::Post(_))));
        assert!(fetcher.lookup("https://b.example/1").await.is_err());
        assert!(fetcher.lookup("https://c.example/1").await.unwrap().is_none());
        assert_eq!(fetcher.lookups().len(), 3);
    }

    #[tokio::test]
    async fn test_traverse_counts_pulled_items() {
        let outbox = "https://a.example/users/x/outbox";
        let fetcher = StaticFetcher::new().with_outbox(
            outbox,
            vec![
                Ok(create(note("https://a.example/1", "a"))),
                Ok(announce("https://b.example/2")),
                Ok(create(note("https://a.example/3", "c"))),
            ],
        );
        let first: Vec<_> = fetcher
            .traverse(CollectionRef::new(outbox))
            .take(2)
            .collect()
            .await;
        assert_eq!(first.len(), 2);
        assert_eq!(fetcher.pulled(), 2);
    }

    #[tokio::test]
    async fn test_activity_object_default() {
        let fetcher = StaticFetcher::new().with_post(note("https://a.example/9", "x"));
        let linked = Activity::with_link(ActivityKind::Create, "https://a.example/9");
        let object = fetcher.activity_object(&linked).await.unwrap();
        assert!(matches!(object, Some(FederationObject::Post(_))));

        let embedded = create(note("https://a.example/8", "y"));
        let object = fetcher.activity_object(&embedded).await.unwrap();
        assert_eq!(object.and_then(|o| o.id().map(str::to_string)).as_deref(), Some("https://a.example/8"));
    }
}
