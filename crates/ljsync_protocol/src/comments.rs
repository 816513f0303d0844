//! Parsers for the comment-export payloads.
//!
//! The export endpoint returns two embedded XML shapes: a metadata page
//! (comment ids, poster ids and the poster-id → name map) and a body
//! page (full comment records). Both are paginated by `startid`.

use crate::error::{ProtocolError, ProtocolResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Metadata for one comment: its id and who posted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentMeta {
    /// Comment identifier.
    pub comment_id: u64,
    /// Poster identifier; absent for anonymous comments.
    pub poster_id: Option<u64>,
}

/// One page of the comment metadata pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentMetaPage {
    /// Highest comment id that exists on the server.
    pub max_id: u64,
    /// Comment metadata entries in this page.
    pub entries: Vec<CommentMeta>,
    /// Poster-id → display-name pairs carried by this page.
    pub user_names: Vec<(u64, String)>,
}

/// A raw comment as fetched from the body pass, before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    /// Comment identifier.
    pub comment_id: u64,
    /// Identifier of the post this comment belongs to.
    pub post_item_id: u64,
    /// Poster identifier; absent for anonymous comments.
    pub poster_id: Option<u64>,
    /// Comment body text.
    pub body: String,
    /// Subject line, if the comment has one.
    pub subject: Option<String>,
    /// Comment time as reported by the server.
    pub date: String,
    /// Server state flag; `D` marks a deleted comment.
    pub state: Option<char>,
}

impl RawComment {
    /// Returns true if the server marked this comment deleted.
    ///
    /// Deleted comments are dropped before assembly and never reach
    /// the output sequence.
    pub fn is_deleted(&self) -> bool {
        self.state == Some('D')
    }
}

/// One page of the comment body pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentBodyPage {
    /// Comments in this page, id order.
    pub comments: Vec<RawComment>,
}

impl CommentMetaPage {
    /// Parses a `get=comment_meta` export payload.
    pub fn parse(body: &[u8]) -> ProtocolResult<CommentMetaPage> {
        let text = std::str::from_utf8(body)
            .map_err(|_| ProtocolError::malformed("export payload is not valid UTF-8"))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut page = CommentMetaPage::default();
        let mut max_id: Option<u64> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"maxid" => {
                        // Start only; <maxid/> would carry no number
                        max_id = Some(read_number(&mut reader, b"maxid")?);
                    }
                    b"comment" => {
                        page.entries.push(CommentMeta {
                            comment_id: require_attr_u64(&e, b"id")?,
                            poster_id: attr_u64(&e, b"posterid")?,
                        });
                    }
                    b"usermap" => {
                        let id = require_attr_u64(&e, b"id")?;
                        let name =
                            attr(&e, b"user")?.ok_or(ProtocolError::MissingField("user"))?;
                        page.user_names.push((id, name));
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        page.max_id = max_id.ok_or(ProtocolError::MissingField("maxid"))?;
        Ok(page)
    }

    /// Returns the highest comment id present in this page's entries.
    pub fn highest_entry_id(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.comment_id).max()
    }
}

impl CommentBodyPage {
    /// Parses a `get=comment_body` export payload.
    pub fn parse(body: &[u8]) -> ProtocolResult<CommentBodyPage> {
        let text = std::str::from_utf8(body)
            .map_err(|_| ProtocolError::malformed("export payload is not valid UTF-8"))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut page = CommentBodyPage::default();
        let mut current: Option<RawComment> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"comment" => {
                        current = Some(comment_shell(&e)?);
                    }
                    b"body" => {
                        if let Some(comment) = current.as_mut() {
                            comment.body = read_text(&mut reader, b"body")?;
                        }
                    }
                    b"subject" => {
                        if let Some(comment) = current.as_mut() {
                            let subject = read_text(&mut reader, b"subject")?;
                            comment.subject = Some(subject).filter(|s| !s.is_empty());
                        }
                    }
                    b"date" => {
                        if let Some(comment) = current.as_mut() {
                            comment.date = read_text(&mut reader, b"date")?;
                        }
                    }
                    _ => {}
                },
                Event::Empty(e) if e.name().as_ref() == b"comment" => {
                    // Self-closed comments carry attributes only
                    page.comments.push(comment_shell(&e)?);
                }
                Event::End(e) if e.name().as_ref() == b"comment" => {
                    if let Some(comment) = current.take() {
                        page.comments.push(comment);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(page)
    }

    /// Returns the highest comment id in this page.
    pub fn highest_id(&self) -> Option<u64> {
        self.comments.iter().map(|c| c.comment_id).max()
    }
}

fn comment_shell(e: &BytesStart<'_>) -> ProtocolResult<RawComment> {
    Ok(RawComment {
        comment_id: require_attr_u64(e, b"id")?,
        post_item_id: require_attr_u64(e, b"jitemid")?,
        poster_id: attr_u64(e, b"posterid")?,
        body: String::new(),
        subject: None,
        date: String::new(),
        state: attr(e, b"state")?.and_then(|s| s.chars().next()),
    })
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> ProtocolResult<Option<String>> {
    for attribute in e.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == name {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_u64(e: &BytesStart<'_>, name: &[u8]) -> ProtocolResult<Option<u64>> {
    match attr(e, name)? {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map(Some)
            .map_err(|_| ProtocolError::malformed(format!("bad numeric attribute `{raw}`"))),
        _ => Ok(None),
    }
}

fn require_attr_u64(e: &BytesStart<'_>, name: &'static [u8]) -> ProtocolResult<u64> {
    attr_u64(e, name)?.ok_or_else(|| {
        ProtocolError::malformed(format!(
            "missing attribute `{}`",
            String::from_utf8_lossy(name)
        ))
    })
}

fn read_text(reader: &mut Reader<&[u8]>, end: &[u8]) -> ProtocolResult<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => {
                text.push_str(
                    std::str::from_utf8(&c)
                        .map_err(|_| ProtocolError::malformed("CDATA is not valid UTF-8"))?,
                );
            }
            Event::End(e) if e.name().as_ref() == end => return Ok(text),
            Event::Eof => return Err(ProtocolError::malformed("truncated element")),
            _ => {}
        }
    }
}

fn read_number(reader: &mut Reader<&[u8]>, end: &[u8]) -> ProtocolResult<u64> {
    let text = read_text(reader, end)?;
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::malformed(format!("bad number `{}`", text.trim())))
}
