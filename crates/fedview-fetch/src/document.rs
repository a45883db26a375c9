//! Mapping of compacted ActivityStreams JSON onto fedview's typed objects.
//!
//! Only the compacted form is understood; properties are read by their short
//! names. Values that ActivityStreams allows as "string or object or array"
//! are handled uniformly through [`first`] and [`link_id`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use fedview_core::{
    Activity, ActivityKind, ActorObject, Attachment, CollectionRef, FederationObject, Image,
    Linked, MediaKind, PostObject, Tag, ACTOR_TYPES, POST_TYPES,
};

const COLLECTION_TYPES: &[&str] = &[
    "Collection",
    "OrderedCollection",
    "CollectionPage",
    "OrderedCollectionPage",
];

/// Returns the first element of an array, or the value itself.
pub fn first(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Null => None,
        other => Some(other),
    }
}

/// Returns the id of a value that is either a bare link or an object with `id`/`href`.
pub fn link_id(value: &Value) -> Option<String> {
    match first(value)? {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("href"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Returns the object's type name.
pub fn type_of(value: &Value) -> Option<&str> {
    first(value.get("type")?)?.as_str()
}

fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn timestamp(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = value.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn content(value: &Value) -> Option<String> {
    string(value, "content").or_else(|| {
        value
            .get("contentMap")
            .and_then(Value::as_object)
            .and_then(|map| map.values().find_map(Value::as_str))
            .map(str::to_string)
    })
}

fn url_of(value: &Value) -> Option<String> {
    value.get("url").and_then(link_id)
}

fn many<T>(value: Option<&Value>, parse: impl Fn(&Value) -> Option<T>) -> Vec<Linked<T>> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single],
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(Linked::Link(id.clone())),
            Value::Object(_) => parse(item).map(Linked::Embedded),
            _ => None,
        })
        .collect()
}

/// Parses any document into a [`FederationObject`].
///
/// Returns `None` if the document is not a JSON object.
pub fn parse_object(value: &Value) -> Option<FederationObject> {
    if !value.is_object() {
        return None;
    }
    let object_type = type_of(value).unwrap_or_default();

    let object = if POST_TYPES.contains(&object_type) {
        FederationObject::Post(parse_post(value)?)
    } else if ACTOR_TYPES.contains(&object_type) {
        FederationObject::Actor(parse_actor(value)?)
    } else if COLLECTION_TYPES.contains(&object_type) {
        FederationObject::Collection(parse_collection(value)?)
    } else if value.get("object").is_some() && value.get("actor").is_some() {
        FederationObject::Activity(parse_activity(value))
    } else {
        FederationObject::Other {
            id: string(value, "id"),
            object_type: object_type.to_string(),
        }
    };
    Some(object)
}

/// Parses a post-shaped document. Requires an `id`.
pub fn parse_post(value: &Value) -> Option<PostObject> {
    Some(PostObject {
        id: string(value, "id")?,
        object_type: type_of(value).unwrap_or("Note").to_string(),
        content: content(value),
        published: timestamp(value, "published"),
        url: url_of(value),
        attributed_to: value.get("attributedTo").and_then(link_id),
        tags: many(value.get("tag"), parse_tag),
        attachments: many(value.get("attachment"), parse_attachment),
    })
}

/// Parses an actor document. Requires an `id`.
pub fn parse_actor(value: &Value) -> Option<ActorObject> {
    let icon = value.get("icon").and_then(first).and_then(|icon| match icon {
        Value::String(id) => Some(Linked::Link(id.clone())),
        Value::Object(_) => parse_image(icon).map(Linked::Embedded),
        _ => None,
    });

    Some(ActorObject {
        id: string(value, "id")?,
        actor_type: type_of(value).unwrap_or("Person").to_string(),
        preferred_username: string(value, "preferredUsername"),
        name: string(value, "name").filter(|n| !n.is_empty()),
        summary: string(value, "summary"),
        url: url_of(value),
        icon,
        tags: many(value.get("tag"), parse_tag),
        outbox: value.get("outbox").and_then(link_id),
        followers: value.get("followers").and_then(link_id),
        following: value.get("following").and_then(link_id),
        published: timestamp(value, "published"),
    })
}

/// Parses an activity wrapper.
pub fn parse_activity(value: &Value) -> Activity {
    let object = value.get("object").and_then(first).and_then(|object| match object {
        Value::String(id) => Some(Linked::Link(id.clone())),
        Value::Object(_) => parse_object(object).map(|o| Linked::Embedded(Box::new(o))),
        _ => None,
    });

    Activity {
        id: string(value, "id"),
        kind: ActivityKind::from_type(type_of(value).unwrap_or_default()),
        actor: value.get("actor").and_then(link_id),
        object,
    }
}

/// Parses an outbox entry. Bare links become [`Activity::link`] entries.
pub fn parse_outbox_item(value: &Value) -> Option<Activity> {
    match value {
        Value::String(id) => Some(Activity::link(id.clone())),
        Value::Object(_) => Some(parse_activity(value)),
        _ => None,
    }
}

/// Parses a collection reference. Requires an `id`.
pub fn parse_collection(value: &Value) -> Option<CollectionRef> {
    Some(CollectionRef {
        id: string(value, "id")?,
        total_items: value.get("totalItems").and_then(Value::as_u64),
    })
}

/// Parses a tag object.
pub fn parse_tag(value: &Value) -> Option<Tag> {
    let tag_type = type_of(value)?;
    let tag = match tag_type {
        "Emoji" => Tag::Emoji {
            id: string(value, "id"),
            name: string(value, "name")?,
            icon: value.get("icon").and_then(first).and_then(parse_image),
        },
        "Hashtag" => Tag::Hashtag {
            name: string(value, "name")?,
            href: string(value, "href"),
        },
        "Mention" => Tag::Mention {
            name: string(value, "name")?,
            href: string(value, "href"),
        },
        other => Tag::Other {
            tag_type: other.to_string(),
        },
    };
    Some(tag)
}

/// Parses an image reference: a bare URL or an `Image` object.
pub fn parse_image(value: &Value) -> Option<Image> {
    match value {
        Value::String(url) => Some(Image::new(url.clone())),
        Value::Object(_) => Some(Image {
            url: url_of(value)?,
            media_type: string(value, "mediaType"),
        }),
        _ => None,
    }
}

/// Parses an attachment object.
pub fn parse_attachment(value: &Value) -> Option<Attachment> {
    let media_type = string(value, "mediaType");
    let media_kind = match media_type.as_deref() {
        Some(mime) => MediaKind::from_media_type(Some(mime)),
        None => type_of(value)
            .and_then(MediaKind::from_object_type)
            .unwrap_or_else(|| MediaKind::Other(String::new())),
    };

    Some(Attachment {
        url: url_of(value)?,
        alt_text: string(value, "name").filter(|n| !n.is_empty()),
        width: dimension(value, "width"),
        height: dimension(value, "height"),
        media_kind,
    })
}

fn dimension(value: &Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// Items and next-page link of one collection document.
///
/// A collection whose `first` page is embedded is unwrapped in place.
pub fn page_items(value: &Value) -> (Vec<Activity>, Option<String>) {
    if let Some(first_page) = value.get("first") {
        return match first_page {
            Value::Object(_) => page_items(first_page),
            other => (Vec::new(), link_id(other)),
        };
    }

    let items = value
        .get("orderedItems")
        .or_else(|| value.get("items"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_outbox_item).collect())
        .unwrap_or_default();

    (items, value.get("next").and_then(link_id))
}

/// Finds the ActivityPub actor link in a WebFinger (JRD) document.
pub fn webfinger_self_link(value: &Value) -> Option<String> {
    value
        .get("links")?
        .as_array()?
        .iter()
        .filter(|link| link.get("rel").and_then(Value::as_str) == Some("self"))
        .find(|link| {
            link.get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.contains("activity+json") || t.contains("ld+json"))
        })
        .and_then(|link| string(link, "href"))
}
