//! Typed federation objects produced at the fetcher boundary.
//!
//! A transport turns whatever it received on the wire into one of these shapes,
//! so downstream code pattern-matches on [`FederationObject`] instead of
//! testing vocabulary types at runtime.

use chrono::{DateTime, Utc};

use crate::model::Attachment;

/// A value that is either embedded in its parent document or referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub enum Linked<T> {
    /// The value was embedded in the parent document.
    Embedded(T),
    /// Only the value's id was present; it must be dereferenced.
    Link(String),
}

impl<T> Linked<T> {
    /// Returns the embedded value, if any.
    pub fn embedded(&self) -> Option<&T> {
        match self {
            Self::Embedded(value) => Some(value),
            Self::Link(_) => None,
        }
    }

    /// Returns the referenced id, if this is a link.
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Embedded(_) => None,
            Self::Link(id) => Some(id),
        }
    }
}

/// A remote object as returned by an [`ObjectFetcher`](crate::ObjectFetcher).
#[derive(Debug, Clone, PartialEq)]
pub enum FederationObject {
    /// A single piece of user content (Note, Article, Page, Question).
    Post(PostObject),
    /// An account (Person, Service, Application, Group, Organization).
    Actor(ActorObject),
    /// An activity wrapper (Create, Announce, ...).
    Activity(Activity),
    /// A collection or collection page.
    Collection(CollectionRef),
    /// Anything else.
    Other {
        /// Object id, if present.
        id: Option<String>,
        /// The ActivityStreams type name.
        object_type: String,
    },
}

impl FederationObject {
    /// Returns the object id, if the object carries one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Post(post) => Some(&post.id),
            Self::Actor(actor) => Some(&actor.id),
            Self::Activity(activity) => activity.id.as_deref(),
            Self::Collection(collection) => Some(&collection.id),
            Self::Other { id, .. } => id.as_deref(),
        }
    }

    /// Short name of the object's shape, used in logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Actor(_) => "actor",
            Self::Activity(_) => "activity",
            Self::Collection(_) => "collection",
            Self::Other { .. } => "other",
        }
    }

    /// Consumes the object, returning the post if it is post-shaped.
    pub fn into_post(self) -> Option<PostObject> {
        match self {
            Self::Post(post) => Some(post),
            _ => None,
        }
    }

    /// Consumes the object, returning the actor if it is actor-shaped.
    pub fn into_actor(self) -> Option<ActorObject> {
        match self {
            Self::Actor(actor) => Some(actor),
            _ => None,
        }
    }
}

/// Post types recognised as post-shaped.
pub const POST_TYPES: &[&str] = &["Note", "Article", "Page", "Question"];

/// Actor types recognised as actor-shaped.
pub const ACTOR_TYPES: &[&str] = &["Person", "Service", "Application", "Group", "Organization"];

/// A post-shaped remote object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostObject {
    /// Canonical id (an absolute URL).
    pub id: String,
    /// ActivityStreams type, e.g. `Note`.
    pub object_type: String,
    /// HTML content.
    pub content: Option<String>,
    /// Publication time.
    pub published: Option<DateTime<Utc>>,
    /// Human-facing URL.
    pub url: Option<String>,
    /// Declared author id. Not used for author resolution.
    pub attributed_to: Option<String>,
    /// Tags (emoji, hashtags, mentions).
    pub tags: Vec<Linked<Tag>>,
    /// Media attachments.
    pub attachments: Vec<Linked<Attachment>>,
}

/// An actor-shaped remote object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActorObject {
    /// Canonical id (an absolute URL).
    pub id: String,
    /// ActivityStreams type, e.g. `Person`.
    pub actor_type: String,
    /// Account name without host.
    pub preferred_username: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// HTML profile summary.
    pub summary: Option<String>,
    /// Profile page URL.
    pub url: Option<String>,
    /// Avatar.
    pub icon: Option<Linked<Image>>,
    /// Tags (custom emoji used in the name or summary).
    pub tags: Vec<Linked<Tag>>,
    /// Outbox collection id.
    pub outbox: Option<String>,
    /// Followers collection id.
    pub followers: Option<String>,
    /// Following collection id.
    pub following: Option<String>,
    /// Account creation time.
    pub published: Option<DateTime<Utc>>,
}

/// An image reference (avatar, emoji icon).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Media type, if declared.
    pub media_type: Option<String>,
}

impl Image {
    /// Creates an image with no declared media type.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            media_type: None,
        }
    }
}

/// Tag attached to a post or actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// Custom emoji; `name` is the literal shortcode such as `:blobcat:`.
    Emoji {
        /// Emoji id, if present.
        id: Option<String>,
        /// Shortcode.
        name: String,
        /// Emoji image.
        icon: Option<Image>,
    },
    /// Hashtag.
    Hashtag {
        /// Hashtag text including `#`.
        name: String,
        /// Hashtag page.
        href: Option<String>,
    },
    /// Mention of another account.
    Mention {
        /// Mention text, usually `@user@host`.
        name: String,
        /// Mentioned actor id.
        href: Option<String>,
    },
    /// Unrecognised tag type.
    Other {
        /// ActivityStreams type name.
        tag_type: String,
    },
}

/// Kind of activity wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    /// A new object was created.
    Create,
    /// A boost.
    Announce,
    /// A favourite.
    Like,
    /// An edit.
    Update,
    /// A deletion.
    Delete,
    /// Any other activity type.
    Other(String),
}

impl ActivityKind {
    /// Parses an ActivityStreams type name.
    pub fn from_type(name: &str) -> Self {
        match name {
            "Create" => Self::Create,
            "Announce" => Self::Announce,
            "Like" => Self::Like,
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this activity announces a newly created object.
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create)
    }
}

/// An activity wrapper as found in an outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    /// Activity id.
    pub id: Option<String>,
    /// Activity kind.
    pub kind: ActivityKind,
    /// Actor id.
    pub actor: Option<String>,
    /// Payload object.
    pub object: Option<Linked<Box<FederationObject>>>,
}

impl Activity {
    /// Creates an activity with an embedded payload.
    pub fn with_object(kind: ActivityKind, object: FederationObject) -> Self {
        Self {
            id: None,
            kind,
            actor: None,
            object: Some(Linked::Embedded(Box::new(object))),
        }
    }

    /// Creates an activity whose payload is referenced by id.
    pub fn with_link(kind: ActivityKind, object_id: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            actor: None,
            object: Some(Linked::Link(object_id.into())),
        }
    }

    /// An outbox entry given only by its id.
    pub fn link(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: ActivityKind::Other("Link".to_string()),
            actor: None,
            object: None,
        }
    }

    /// Whether this entry must be fetched before its type is known.
    pub fn is_link(&self) -> bool {
        self.object.is_none() && matches!(&self.kind, ActivityKind::Other(t) if t == "Link")
    }
}

/// Reference to a remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    /// Collection id.
    pub id: String,
    /// `totalItems`, when the server publishes it.
    pub total_items: Option<u64>,
}

impl CollectionRef {
    /// Creates a reference with unknown size.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            total_items: None,
        }
    }
}
