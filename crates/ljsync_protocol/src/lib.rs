//! # ljsync Protocol
//!
//! Wire-format types and codecs for the two LiveJournal sync surfaces.
//!
//! This crate provides:
//! - Challenge-response digest computation
//! - The flat key/value codec used by `/interface/flat`
//! - A minimal XML-RPC codec covering `getchallenge`, `syncitems`
//!   and `getevents`
//! - Parsers for the comment-export payloads (metadata and bodies)
//! - Canonical post/comment records handed to a serializer
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod challenge;
mod comments;
mod error;
mod event;
mod flat;
mod records;
mod syncitems;
pub mod xmlrpc;

pub use challenge::{challenge_response, Challenge};
pub use comments::{CommentBodyPage, CommentMeta, CommentMetaPage, RawComment};
pub use error::{ProtocolError, ProtocolResult};
pub use event::RawPost;
pub use flat::{decode_flat, FlatResponse};
pub use records::{CanonicalComment, CanonicalPost, Record};
pub use syncitems::{ItemKind, SyncItem, SyncItemsPage};
pub use xmlrpc::{decode_response, encode_call, Value};
