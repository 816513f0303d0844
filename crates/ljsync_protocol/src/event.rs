//! Post payloads returned by the `getevents` surface.

use crate::error::{ProtocolError, ProtocolResult};
use crate::xmlrpc::Value;

/// A raw post as fetched from the server, before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    /// Server-side post identifier.
    pub item_id: u64,
    /// Post time in the server's `YYYY-MM-DD HH:MM:SS` format.
    pub event_time: String,
    /// Post body, normalized to text.
    pub body: String,
    /// Subject line, if the post has one.
    pub subject: Option<String>,
    /// Comma-separated tag list, if the post has one.
    pub tags_csv: Option<String>,
    /// Public permalink of the post.
    pub url: String,
}

impl RawPost {
    /// Decodes one entry of the `getevents` response `events` array.
    ///
    /// The `event` body and the `taglist` prop arrive as either plain
    /// strings or opaque binary wrappers; both are normalized to text
    /// here so nothing downstream sees the transport encoding.
    pub fn from_value(event: &Value) -> ProtocolResult<RawPost> {
        let item_id = event
            .get("itemid")
            .and_then(Value::as_int)
            .ok_or(ProtocolError::MissingField("itemid"))?;
        let event_time = event
            .get("eventtime")
            .and_then(|v| v.as_text())
            .ok_or(ProtocolError::MissingField("eventtime"))?
            .into_owned();
        let body = event
            .get("event")
            .and_then(|v| v.as_text())
            .ok_or(ProtocolError::MissingField("event"))?
            .into_owned();

        let subject = event
            .get("subject")
            .and_then(|v| v.as_text())
            .map(|s| s.into_owned())
            .filter(|s| !s.is_empty());

        let tags_csv = event
            .get("props")
            .and_then(|props| props.get("taglist"))
            .and_then(|v| v.as_text())
            .map(|s| s.into_owned())
            .filter(|s| !s.is_empty());

        let url = event
            .get("url")
            .and_then(|v| v.as_text())
            .map(|s| s.into_owned())
            .unwrap_or_default();

        Ok(RawPost {
            item_id: item_id as u64,
            event_time,
            body,
            subject,
            tags_csv,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_struct(body: Value) -> Value {
        Value::structure(vec![
            ("itemid", Value::Int(1181)),
            ("eventtime", Value::String("2008-03-01 12:00:00".into())),
            ("event", body),
            ("url", Value::String("http://example.com/1181.html".into())),
            (
                "props",
                Value::structure(vec![("taglist", Value::String("rust, sync".into()))]),
            ),
        ])
    }

    #[test]
    fn decodes_text_body() {
        let post = RawPost::from_value(&event_struct(Value::String("hello".into()))).unwrap();
        assert_eq!(post.item_id, 1181);
        assert_eq!(post.body, "hello");
        assert_eq!(post.subject, None);
        assert_eq!(post.tags_csv.as_deref(), Some("rust, sync"));
        assert_eq!(post.url, "http://example.com/1181.html");
    }

    #[test]
    fn binary_body_normalized_to_text() {
        let post =
            RawPost::from_value(&event_struct(Value::Base64(b"binary body".to_vec()))).unwrap();
        assert_eq!(post.body, "binary body");
    }

    #[test]
    fn empty_subject_treated_as_missing() {
        let value = Value::structure(vec![
            ("itemid", Value::Int(1)),
            ("eventtime", Value::String("2008-03-01 12:00:00".into())),
            ("event", Value::String("body".into())),
            ("subject", Value::String(String::new())),
        ]);
        let post = RawPost::from_value(&value).unwrap();
        assert_eq!(post.subject, None);
        assert_eq!(post.tags_csv, None);
        assert!(post.url.is_empty());
    }

    #[test]
    fn missing_body_is_protocol_error() {
        let value = Value::structure(vec![
            ("itemid", Value::Int(1)),
            ("eventtime", Value::String("2008-03-01 12:00:00".into())),
        ]);
        assert_eq!(
            RawPost::from_value(&value),
            Err(ProtocolError::MissingField("event"))
        );
    }
}
