//! Assembles raw protocol payloads into canonical records.

use crate::comments::AuthorMap;
use crate::error::{SyncError, SyncResult};
use chrono::NaiveDateTime;
use ljsync_protocol::{CanonicalComment, CanonicalPost, RawComment, RawPost};
use regex::Regex;
use std::sync::OnceLock;

const SNIPPET_LIMIT: usize = 50;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The pattern is a literal and always compiles
    PATTERN.get_or_init(|| Regex::new("<[^>]+>").unwrap_or_else(|_| unreachable!()))
}

/// Derives a title snippet from body text.
///
/// HTML tags are stripped; text shorter than 50 characters passes
/// through unchanged, longer text truncates to the first 49 characters
/// plus an ellipsis marker (52 characters total).
pub fn snippet(content: &str) -> String {
    let stripped = tag_pattern().replace_all(content, "");
    let chars: Vec<char> = stripped.chars().collect();
    if chars.len() < SNIPPET_LIMIT {
        return stripped.into_owned();
    }
    let mut out: String = chars[..SNIPPET_LIMIT - 1].iter().collect();
    out.push_str("...");
    out
}

/// Renders body text for hand-off: line breaks become explicit break
/// markers.
pub fn render(content: &str) -> String {
    content.replace("\r\n", "<br/>")
}

/// Splits a comma-separated tag string into trimmed, non-empty labels.
pub fn split_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Normalizes a server timestamp to RFC 3339 UTC.
///
/// The server's `YYYY-MM-DD HH:MM:SS` local format is treated as
/// already UTC; this lossy, timezone-unaware conversion reproduces the
/// reference behavior. Timestamps the server already reports in
/// RFC 3339 UTC pass through unchanged.
pub fn normalize_timestamp(raw: &str) -> SyncResult<String> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(parsed.format("%Y-%m-%dT%H:%M:%SZ").to_string());
    }
    if NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ").is_ok() {
        return Ok(raw.to_string());
    }
    Err(SyncError::Time(raw.to_string()))
}

/// Assembles a canonical post from a raw event payload.
pub fn assemble_post(raw: &RawPost, username: &str) -> SyncResult<CanonicalPost> {
    let published = normalize_timestamp(&raw.event_time)?;
    let title = match &raw.subject {
        Some(subject) => subject.clone(),
        None => snippet(&raw.body),
    };
    let tags = raw
        .tags_csv
        .as_deref()
        .map(split_tags)
        .unwrap_or_default();

    Ok(CanonicalPost {
        id: format!("post-{}", raw.item_id),
        title,
        content: render(&raw.body),
        author: username.to_string(),
        updated: published.clone(),
        published,
        permalink: raw.url.clone(),
        tags,
    })
}

/// Assembles a canonical comment, resolving its author through the
/// completed identity map.
pub fn assemble_comment(raw: &RawComment, authors: &AuthorMap) -> SyncResult<CanonicalComment> {
    let published = normalize_timestamp(&raw.date)?;
    let content = render(&raw.body);
    let title = match &raw.subject {
        Some(subject) => subject.clone(),
        None => snippet(&content),
    };

    Ok(CanonicalComment {
        id: format!("comment-{}", raw.comment_id),
        parent_post_id: format!("post-{}", raw.post_item_id),
        title,
        content,
        author: authors.author_for(raw.comment_id).to_string(),
        updated: published.clone(),
        published,
    })
}
