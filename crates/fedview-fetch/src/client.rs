//! The HTTP object fetcher.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use fedview_core::{
    Activity, ActorObject, Attachment, CollectionRef, FederationObject, FetchError,
    FetchResult, Image, Linked, ObjectFetcher, Tag,
};

use crate::config::HttpFetcherConfig;
use crate::document;
use crate::transport::map_reqwest_error;

/// `Accept` header sent for ActivityStreams documents.
pub const ACTIVITY_ACCEPT: &str =
    r#"application/activity+json, application/ld+json; profile="https://www.w3.org/ns/activitystreams""#;

/// `Accept` header sent for WebFinger documents.
pub const JRD_ACCEPT: &str = "application/jrd+json, application/json";

/// Unsigned ActivityStreams fetcher.
///
/// Speaks compacted JSON over HTTPS and WebFinger. Requests carry no HTTP
/// signature, so servers enforcing authorized fetch answer 401 or 403.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    /// Creates a fetcher.
    pub fn new(config: HttpFetcherConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to create client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }

    async fn get_json(&self, url: &str, accept: &str) -> FetchResult<Value> {
        debug!(url = %url, "fetching document");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, url, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "non-success response");
            return Err(FetchError::status(status.as_u16(), url));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| map_reqwest_error(&e, url, self.config.timeout))
    }

    /// Resolves a handle to its actor URL via WebFinger.
    pub async fn webfinger(&self, user: &str, domain: &str) -> FetchResult<Option<String>> {
        let mut url = url::Url::parse(&format!("https://{domain}/.well-known/webfinger"))
            .map_err(|e| FetchError::parse(domain, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("resource", &format!("acct:{user}@{domain}"));

        match self.get_json(url.as_str(), JRD_ACCEPT).await {
            Ok(jrd) => Ok(document::webfinger_self_link(&jrd)),
            Err(FetchError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn dereference_tag(&self, id: &str) -> FetchResult<Tag> {
        let value = self.get_json(id, ACTIVITY_ACCEPT).await?;
        document::parse_tag(&value).ok_or_else(|| FetchError::parse(id, "not a tag"))
    }

    async fn dereference_attachment(&self, id: &str) -> FetchResult<Attachment> {
        let value = self.get_json(id, ACTIVITY_ACCEPT).await?;
        document::parse_attachment(&value).ok_or_else(|| FetchError::parse(id, "not an attachment"))
    }
}

fn handle_parts(target: &str) -> Option<(&str, &str)> {
    if target.contains('/') {
        return None;
    }
    target
        .trim_start_matches('@')
        .split_once('@')
        .filter(|(user, domain)| !user.is_empty() && domain.contains('.'))
}

struct PageCursor {
    collection: String,
    next: Option<String>,
    buffer: VecDeque<Activity>,
    pages: usize,
}

#[async_trait]
impl ObjectFetcher for HttpFetcher {
    async fn lookup(&self, target: &str) -> FetchResult<Option<FederationObject>> {
        let url = match handle_parts(target) {
            Some((user, domain)) => match self.webfinger(user, domain).await? {
                Some(url) => url,
                None => return Ok(None),
            },
            None => target.to_string(),
        };

        let value = self.get_json(&url, ACTIVITY_ACCEPT).await?;
        Ok(document::parse_object(&value))
    }

    fn tags<'a>(&'a self, tags: &'a [Linked<Tag>]) -> BoxStream<'a, FetchResult<Tag>> {
        stream::iter(tags)
            .then(move |tag| async move {
                match tag {
                    Linked::Embedded(tag) => Ok(tag.clone()),
                    Linked::Link(id) => self.dereference_tag(id).await,
                }
            })
            .boxed()
    }

    fn attachments<'a>(
        &'a self,
        attachments: &'a [Linked<Attachment>],
    ) -> BoxStream<'a, FetchResult<Attachment>> {
        stream::iter(attachments)
            .then(move |attachment| async move {
                match attachment {
                    Linked::Embedded(attachment) => Ok(attachment.clone()),
                    Linked::Link(id) => self.dereference_attachment(id).await,
                }
            })
            .boxed()
    }

    async fn icon(&self, actor: &ActorObject) -> FetchResult<Option<Image>> {
        match &actor.icon {
            Some(Linked::Embedded(image)) => Ok(Some(image.clone())),
            Some(Linked::Link(id)) => {
                let value = self.get_json(id, ACTIVITY_ACCEPT).await?;
                Ok(document::parse_image(&value))
            }
            None => Ok(None),
        }
    }

    async fn outbox(&self, actor: &ActorObject) -> FetchResult<Option<CollectionRef>> {
        Ok(actor.outbox.as_deref().map(CollectionRef::new))
    }

    fn traverse<'a>(&'a self, collection: CollectionRef) -> BoxStream<'a, FetchResult<Activity>> {
        let cursor = PageCursor {
            collection: collection.id.clone(),
            next: Some(collection.id),
            buffer: VecDeque::new(),
            pages: 0,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            loop {
                if let Some(activity) = cursor.buffer.pop_front() {
                    return Some((Ok(activity), cursor));
                }
                let url = cursor.next.take()?;
                if cursor.pages >= self.config.max_pages {
                    debug!(collection = %cursor.collection, pages = cursor.pages, "page limit reached");
                    return None;
                }
                cursor.pages += 1;

                match self.get_json(&url, ACTIVITY_ACCEPT).await {
                    Ok(page) => {
                        let (items, next) = document::page_items(&page);
                        debug!(url = %url, items = items.len(), "fetched collection page");
                        cursor.buffer.extend(items);
                        cursor.next = next.filter(|next| *next != url);
                    }
                    Err(e) => return Some((Err(e), cursor)),
                }
            }
        })
        .boxed()
    }

    async fn collection_total(&self, collection_id: &str) -> FetchResult<Option<u64>> {
        let value = self.get_json(collection_id, ACTIVITY_ACCEPT).await?;
        Ok(value.get("totalItems").and_then(Value::as_u64))
    }
}
