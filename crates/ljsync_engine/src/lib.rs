//! # ljsync Engine
//!
//! Sync state machine for pulling a journal's full history (posts and
//! comments) out of a LiveJournal-protocol host.
//!
//! This crate provides:
//! - Challenge-response authentication over both sync surfaces
//! - The cursor-paginated post walker
//! - The two-pass, id-paginated comment exporter
//! - A bounded retry budget shared by both walkers
//! - The record assembler producing canonical posts/comments
//! - An HTTP transport abstraction (bring your own HTTP stack)
//!
//! ## Architecture
//!
//! One sync run is single-threaded and blocking: every remote call is
//! awaited before the next is issued, and the only suspension points
//! are transport calls and the fixed inter-retry delay. A run owns all
//! of its cursors and maps; nothing is shared across runs.
//!
//! ## Key invariants
//!
//! - Challenges are single-use: one authenticate per remote call
//! - The post cursor advances only after an item is fully handled
//! - The comment body pass never starts before the metadata pass
//!   completes (author resolution depends on the finished map)
//! - Deleted and orphaned comments are dropped, never emitted

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod assemble;
mod auth;
mod comments;
mod config;
mod engine;
mod error;
mod http;
mod posts;
mod retry;
mod transport;

pub use assemble::{assemble_comment, assemble_post, render, snippet, split_tags};
pub use auth::{AuthTokens, Authenticator, RpcAuthenticator, SessionAuthenticator};
pub use comments::{AuthorMap, CommentExporter};
pub use config::{RetryConfig, SyncConfig};
pub use engine::{SyncEngine, SyncOutcome, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRequest, HttpTransport};
pub use posts::PostWalker;
pub use retry::RetryBudget;
pub use transport::{
    GetEventRequest, MockTransport, SessionRequest, SessionToken, SyncItemsRequest, SyncTransport,
    TransportCall,
};
