//! The scheduled post entity and its identifier types.
//!
//! A [`Post`] is a read-only projection of a task-store record. Posts are
//! created and edited externally; this system only observes them and writes
//! back status transitions. Store-side enum values keep the literal strings
//! used by the editorial database (`Programmato`, `Pubblicato`, `Errore`).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task-store record identifier (a Notion page id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Wraps a raw store identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Provider-assigned identifier of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Wraps a raw provider message id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw provider value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rendering type of a post, determining required fields and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    /// Plain text message.
    Text,
    /// Image with the body as caption.
    ImageText,
    /// Poll with a question and 2-10 options.
    Poll,
}

impl PostType {
    /// Maps a store type tag to a post type.
    ///
    /// Unknown tags fall back to [`PostType::Text`], matching the store's
    /// default rendering for untyped records.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Telegram_poll" | "Poll" => Self::Poll,
            "Immagine+Testo" => Self::ImageText,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::ImageText => write!(f, "image_text"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Store-side lifecycle status of a post.
///
/// Only `Scheduled` posts are ever acted upon. Any status string this
/// system does not recognize (draft states, editorial markers) maps to
/// `Other` and is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Due for publication once its release time passes.
    Scheduled,
    /// Successfully delivered; terminal.
    Published,
    /// Validation or delivery failed; terminal until edited externally.
    Error,
    /// Unrecognized store status, never acted upon.
    Other(String),
}

impl PostStatus {
    /// Parses the literal store status string.
    #[must_use]
    pub fn from_store(name: &str) -> Self {
        match name {
            "Programmato" => Self::Scheduled,
            "Pubblicato" => Self::Published,
            "Errore" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the literal string written back to the store.
    #[must_use]
    pub fn as_store_str(&self) -> &str {
        match self {
            Self::Scheduled => "Programmato",
            Self::Published => "Pubblicato",
            Self::Error => "Errore",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_store_str())
    }
}

/// A post due for publication, as projected from the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Store record identifier.
    pub id: PageId,
    /// Display name, non-authoritative.
    pub title: String,
    /// Message content; required for every type.
    pub body: String,
    /// Rendering type.
    pub post_type: PostType,
    /// Image URL; required for image rendering.
    pub image_url: Option<String>,
    /// Poll question; required for polls.
    pub poll_question: Option<String>,
    /// Poll options as a serialized JSON list of strings.
    pub poll_options: Option<String>,
    /// Optional override of the default publish destination.
    pub channel: Option<String>,
    /// Scheduled release time, normalized to the reference timezone.
    pub publish_at: DateTime<Local>,
    /// Store-observed status at fetch time.
    pub status: PostStatus,
}

impl Post {
    /// Returns the destination channel, falling back to the given default.
    #[must_use]
    pub fn channel_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.channel.as_deref().unwrap_or(default)
    }

    /// True when the store already recorded this post as published.
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_store_strings() {
        for name in ["Programmato", "Pubblicato", "Errore"] {
            assert_eq!(PostStatus::from_store(name).as_store_str(), name);
        }
    }

    #[test]
    fn unknown_status_maps_to_other() {
        let status = PostStatus::from_store("Bozza");
        assert_eq!(status, PostStatus::Other("Bozza".to_string()));
        assert_eq!(status.as_store_str(), "Bozza");
    }

    #[test]
    fn type_tag_mapping() {
        assert_eq!(PostType::from_tag("Telegram_testo"), PostType::Text);
        assert_eq!(PostType::from_tag("Telegram_poll"), PostType::Poll);
        assert_eq!(PostType::from_tag("Poll"), PostType::Poll);
        assert_eq!(PostType::from_tag("Immagine+Testo"), PostType::ImageText);
        assert_eq!(PostType::from_tag("Testo"), PostType::Text);
    }

    #[test]
    fn channel_override() {
        let mut post = Post {
            id: PageId::new("p1"),
            title: "t".to_string(),
            body: "hello".to_string(),
            post_type: PostType::Text,
            image_url: None,
            poll_question: None,
            poll_options: None,
            channel: None,
            publish_at: Local::now(),
            status: PostStatus::Scheduled,
        };
        assert_eq!(post.channel_or("@default"), "@default");

        post.channel = Some("-100123".to_string());
        assert_eq!(post.channel_or("@default"), "-100123");
    }

    #[test]
    fn page_id_serde_is_transparent() {
        let id = PageId::new("abc-123");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"abc-123\"");
    }
}
