//! Canonical, protocol-agnostic records handed to a serializer.

use serde::Serialize;

/// An assembled post, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalPost {
    /// Stable identifier, `post-<item id>`.
    pub id: String,
    /// Subject line, or a derived snippet when the post has none.
    pub title: String,
    /// Rendered body text.
    pub content: String,
    /// Display name of the author.
    pub author: String,
    /// Publication time, RFC 3339 UTC.
    pub published: String,
    /// Last-update time, RFC 3339 UTC.
    pub updated: String,
    /// Public permalink.
    pub permalink: String,
    /// Tag labels, trimmed and non-empty.
    pub tags: Vec<String>,
}

/// An assembled comment, ready for serialization.
///
/// `parent_post_id` is always a non-empty reference to an emitted
/// post; a comment whose parent cannot be resolved is dropped during
/// assembly rather than emitted dangling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalComment {
    /// Stable identifier, `comment-<comment id>`.
    pub id: String,
    /// Identifier of the parent post, `post-<item id>`.
    pub parent_post_id: String,
    /// Subject line, or a derived snippet when the comment has none.
    pub title: String,
    /// Rendered body text.
    pub content: String,
    /// Display name of the author; `Anonymous` when unknown.
    pub author: String,
    /// Publication time, RFC 3339 UTC.
    pub published: String,
    /// Last-update time, RFC 3339 UTC.
    pub updated: String,
}

/// One element of the ordered output sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Record {
    /// A post record.
    Post(CanonicalPost),
    /// A comment record.
    Comment(CanonicalComment),
}

impl Record {
    /// Returns the record's stable identifier.
    pub fn id(&self) -> &str {
        match self {
            Record::Post(post) => &post.id,
            Record::Comment(comment) => &comment.id,
        }
    }
}
