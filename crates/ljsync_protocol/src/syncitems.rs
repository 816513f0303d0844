//! Change-log entries returned by the `syncitems` surface.

use crate::error::{ProtocolError, ProtocolResult};
use crate::xmlrpc::Value;

/// The kind of entity a change-log item refers to.
///
/// Only posts are followed further; comments arrive through the
/// export surface and other kinds are metadata the walk ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A journal post (`L`).
    Post,
    /// A comment (`C`).
    Comment,
    /// Any other kind the walk does not follow.
    Other(char),
}

impl ItemKind {
    fn from_tag(tag: char) -> ItemKind {
        match tag {
            'L' => ItemKind::Post,
            'C' => ItemKind::Comment,
            other => ItemKind::Other(other),
        }
    }
}

/// One entry of the server-side change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    /// What kind of entity changed.
    pub kind: ItemKind,
    /// Server-side identifier of the entity.
    pub item_id: u64,
    /// Change time; feeds the sync cursor.
    pub time: String,
}

impl SyncItem {
    /// Parses the `<kind>-<id>` item reference, e.g. `L-1181`.
    pub fn parse(item: &str, time: &str) -> ProtocolResult<SyncItem> {
        let (tag, id) = item
            .split_once('-')
            .ok_or_else(|| ProtocolError::malformed(format!("bad sync item `{item}`")))?;
        let mut tag_chars = tag.chars();
        let kind = match (tag_chars.next(), tag_chars.next()) {
            (Some(c), None) => ItemKind::from_tag(c),
            _ => return Err(ProtocolError::malformed(format!("bad sync item `{item}`"))),
        };
        let item_id = id
            .parse()
            .map_err(|_| ProtocolError::malformed(format!("bad sync item id `{id}`")))?;
        Ok(SyncItem {
            kind,
            item_id,
            time: time.to_string(),
        })
    }
}

/// One page of the change log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncItemsPage {
    /// Items in this page, oldest first.
    pub items: Vec<SyncItem>,
    /// Server-reported total item count.
    pub total: u64,
    /// Server-reported count for this page.
    pub count: u64,
}

impl SyncItemsPage {
    /// Decodes the `syncitems` response struct.
    pub fn from_value(value: &Value) -> ProtocolResult<SyncItemsPage> {
        let raw_items = value
            .get("syncitems")
            .and_then(Value::as_array)
            .ok_or(ProtocolError::MissingField("syncitems"))?;

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            let item = raw
                .get("item")
                .and_then(|v| v.as_text())
                .ok_or(ProtocolError::MissingField("item"))?;
            let time = raw
                .get("time")
                .and_then(|v| v.as_text())
                .ok_or(ProtocolError::MissingField("time"))?;
            items.push(SyncItem::parse(&item, &time)?);
        }

        Ok(SyncItemsPage {
            items,
            total: value.get("total").and_then(Value::as_int).unwrap_or(0) as u64,
            count: value.get("count").and_then(Value::as_int).unwrap_or(0) as u64,
        })
    }

    /// Returns true if this page carries no items, which ends the walk.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_kinds() {
        let post = SyncItem::parse("L-1181", "2008-03-01 12:00:00").unwrap();
        assert_eq!(post.kind, ItemKind::Post);
        assert_eq!(post.item_id, 1181);
        assert_eq!(post.time, "2008-03-01 12:00:00");

        let comment = SyncItem::parse("C-99", "2008-03-01 12:00:01").unwrap();
        assert_eq!(comment.kind, ItemKind::Comment);

        let other = SyncItem::parse("T-5", "2008-03-01 12:00:02").unwrap();
        assert_eq!(other.kind, ItemKind::Other('T'));
    }

    #[test]
    fn rejects_malformed_items() {
        assert!(SyncItem::parse("L1181", "t").is_err());
        assert!(SyncItem::parse("LX-1181", "t").is_err());
        assert!(SyncItem::parse("L-abc", "t").is_err());
    }

    #[test]
    fn decodes_page_struct() {
        let value = Value::structure(vec![
            (
                "syncitems",
                Value::Array(vec![
                    Value::structure(vec![
                        ("item", Value::String("L-1".into())),
                        ("time", Value::String("2008-01-01 00:00:00".into())),
                    ]),
                    Value::structure(vec![
                        ("item", Value::String("C-2".into())),
                        ("time", Value::String("2008-01-01 00:00:01".into())),
                    ]),
                ]),
            ),
            ("count", Value::Int(2)),
            ("total", Value::Int(2)),
        ]);

        let page = SyncItemsPage::from_value(&value).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.count, 2);
        assert!(!page.is_empty());
    }

    #[test]
    fn missing_items_field_is_protocol_error() {
        let value = Value::structure(vec![("count", Value::Int(0))]);
        assert_eq!(
            SyncItemsPage::from_value(&value),
            Err(ProtocolError::MissingField("syncitems"))
        );
    }
}
