//! Codec for the flat key/value surface (`/interface/flat`).
//!
//! The flat surface replies with a line-oriented blob: keys on even
//! lines, values on odd lines.

use crate::error::{ProtocolError, ProtocolResult};
use std::collections::BTreeMap;

/// Decodes a flat response body into a key/value mapping.
///
/// Lines are paired up even/odd as key/value. A trailing unpaired key
/// is ignored.
pub fn decode_flat(body: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut lines = body.split('\n');
    while let (Some(key), Some(value)) = (lines.next(), lines.next()) {
        map.insert(key.to_string(), value.to_string());
    }
    map
}

/// A decoded flat response with typed accessors.
#[derive(Debug, Clone)]
pub struct FlatResponse {
    values: BTreeMap<String, String>,
}

impl FlatResponse {
    /// Decodes a flat response body.
    pub fn decode(body: &str) -> Self {
        Self {
            values: decode_flat(body),
        }
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value for a key, or a protocol error if absent.
    pub fn require(&self, key: &'static str) -> ProtocolResult<&str> {
        self.get(key).ok_or(ProtocolError::MissingField(key))
    }

    /// Returns the server-reported error message, if any.
    ///
    /// A populated `errmsg` on the session surface means the host
    /// rejected the credentials.
    pub fn error_message(&self) -> Option<&str> {
        self.get("errmsg").filter(|msg| !msg.is_empty())
    }
}
