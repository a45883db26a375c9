//! Normalized records returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A custom emoji: a server-defined image for a textual shortcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomEmoji {
    /// The literal token as it appears in text, e.g. `:blobcat:`.
    pub shortcode: String,
    /// Image URL.
    pub image_url: String,
}

impl CustomEmoji {
    /// Creates a custom emoji.
    pub fn new(shortcode: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            shortcode: shortcode.into(),
            image_url: image_url.into(),
        }
    }
}

/// Broad category of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
    /// Anything else; carries the declared media type (possibly empty).
    Other(String),
}

impl MediaKind {
    /// Derives the kind from a declared MIME type.
    pub fn from_media_type(media_type: Option<&str>) -> Self {
        let mime = media_type.unwrap_or_default().trim();
        match mime.split('/').next().map(str::to_ascii_lowercase).as_deref() {
            Some("image") => Self::Image,
            Some("video") => Self::Video,
            Some("audio") => Self::Audio,
            _ => Self::Other(mime.to_string()),
        }
    }

    /// Derives the kind from an ActivityStreams object type when no MIME type was given.
    pub fn from_object_type(object_type: &str) -> Option<Self> {
        match object_type {
            "Image" => Some(Self::Image),
            "Video" => Some(Self::Video),
            "Audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Returns true for images.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image)
    }
}

/// A media attachment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Media URL.
    pub url: String,
    /// Alternative text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    /// Width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Media category.
    pub media_kind: MediaKind,
}

impl Attachment {
    /// Returns true for image attachments.
    pub fn is_image(&self) -> bool {
        self.media_kind.is_image()
    }
}

/// A resolved post, without its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPost {
    /// Canonical id.
    pub id: String,
    /// HTML content (empty if the post had none).
    pub content_html: String,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Human-facing URL.
    pub canonical_url: Option<String>,
    /// Media attachments.
    pub attachments: Vec<Attachment>,
    /// Custom emoji used in the content.
    pub emojis: Vec<CustomEmoji>,
}

impl ResolvedPost {
    /// Image attachments only.
    pub fn images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_image())
    }
}

/// A resolved account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedActor {
    /// Canonical id.
    pub id: String,
    /// Display name, falling back to the username.
    pub display_name: String,
    /// Account name without host.
    pub preferred_username: String,
    /// Profile page URL.
    pub profile_url: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// HTML profile summary.
    pub summary_html: Option<String>,
    /// Custom emoji used in the name or summary.
    pub emojis: Vec<CustomEmoji>,
    /// Number of followers, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    /// Number of accounts followed, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
    /// Number of outbox items, if published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox_count: Option<u64>,
    /// Account creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl ResolvedActor {
    /// The account handle, `@user@host`.
    pub fn handle(&self) -> String {
        match crate::host_of(&self.id) {
            Some(host) => format!("@{}@{host}", self.preferred_username),
            None => format!("@{}", self.preferred_username),
        }
    }
}

/// A post together with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    /// The post.
    pub post: ResolvedPost,
    /// The post's author.
    pub author: ResolvedActor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_media_type() {
        assert_eq!(MediaKind::from_media_type(Some("image/png")), MediaKind::Image);
        assert_eq!(MediaKind::from_media_type(Some("video/mp4")), MediaKind::Video);
        assert_eq!(MediaKind::from_media_type(Some("audio/ogg")), MediaKind::Audio);
        assert_eq!(
            MediaKind::from_media_type(Some("application/pdf")),
            MediaKind::Other("application/pdf".to_string())
        );
        assert_eq!(
            MediaKind::from_media_type(None),
            MediaKind::Other(String::new())
        );
    }

    #[test]
    fn test_actor_handle() {
        let actor = ResolvedActor {
            id: "https://example.com/users/alice".to_string(),
            display_name: "Alice".to_string(),
            preferred_username: "alice".to_string(),
            profile_url: None,
            avatar_url: None,
            summary_html: None,
            emojis: Vec::new(),
            followers_count: None,
            following_count: None,
            outbox_count: None,
            joined_at: None,
        };
        assert_eq!(actor.handle(), "@alice@example.com");
    }

    #[test]
    fn test_images_filter() {
        let post = ResolvedPost {
            id: "https://example.com/notes/1".to_string(),
            content_html: String::new(),
            published_at: None,
            canonical_url: None,
            attachments: vec![
                Attachment {
                    url: "https://example.com/a.png".to_string(),
                    alt_text: None,
                    width: None,
                    height: None,
                    media_kind: MediaKind::Image,
                },
                Attachment {
                    url: "https://example.com/b.mp4".to_string(),
                    alt_text: None,
                    width: None,
                    height: None,
                    media_kind: MediaKind::Video,
                },
            ],
            emojis: Vec::new(),
        };
        assert_eq!(post.images().count(), 1);
    }
}
