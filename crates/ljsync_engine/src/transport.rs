//! Transport layer abstraction for the two sync surfaces.

use crate::error::{SyncError, SyncResult};
use ljsync_protocol::{Challenge, CommentBodyPage, CommentMetaPage, RawPost, SyncItemsPage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// An authenticated `syncitems` request.
#[derive(Debug, Clone)]
pub struct SyncItemsRequest {
    /// Account username.
    pub username: String,
    /// Sync cursor; empty means "from the beginning".
    pub last_sync: String,
    /// The single-use challenge this request authenticates with.
    pub challenge: Challenge,
    /// The computed challenge response.
    pub response: String,
}

/// An authenticated `getevents` request for one post.
#[derive(Debug, Clone)]
pub struct GetEventRequest {
    /// Account username.
    pub username: String,
    /// Identifier of the post to fetch.
    pub item_id: u64,
    /// The single-use challenge this request authenticates with.
    pub challenge: Challenge,
    /// The computed challenge response.
    pub response: String,
}

/// A `sessiongenerate` request on the flat surface.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Account username.
    pub username: String,
    /// The single-use challenge this request authenticates with.
    pub challenge: Challenge,
    /// The computed challenge response.
    pub response: String,
}

/// A session token for the export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// A sync transport handles network communication with the journal host.
///
/// This trait abstracts both remote surfaces (XML-RPC and flat HTTP),
/// allowing different implementations (HTTP, mock for testing).
pub trait SyncTransport: Send + Sync {
    /// Requests a single-use challenge on the XML-RPC surface.
    fn get_challenge(&self) -> SyncResult<Challenge>;

    /// Lists change-log items since the given cursor.
    fn sync_items(&self, request: &SyncItemsRequest) -> SyncResult<SyncItemsPage>;

    /// Fetches one post body by item id. `None` if the server returned
    /// no event for the id.
    fn get_event(&self, request: &GetEventRequest) -> SyncResult<Option<RawPost>>;

    /// Requests a single-use challenge on the flat surface.
    fn flat_challenge(&self) -> SyncResult<Challenge>;

    /// Exchanges a challenge response for a session token.
    fn generate_session(&self, request: &SessionRequest) -> SyncResult<SessionToken>;

    /// Fetches one page of comment metadata starting at `start_id`.
    fn comment_meta(&self, start_id: u64, session: &SessionToken)
        -> SyncResult<CommentMetaPage>;

    /// Fetches one page of comment bodies starting at `start_id`.
    fn comment_bodies(
        &self,
        start_id: u64,
        session: &SessionToken,
    ) -> SyncResult<CommentBodyPage>;
}

impl<T: SyncTransport + ?Sized> SyncTransport for &T {
    fn get_challenge(&self) -> SyncResult<Challenge> {
        (**self).get_challenge()
    }

    fn sync_items(&self, request: &SyncItemsRequest) -> SyncResult<SyncItemsPage> {
        (**self).sync_items(request)
    }

    fn get_event(&self, request: &GetEventRequest) -> SyncResult<Option<RawPost>> {
        (**self).get_event(request)
    }

    fn flat_challenge(&self) -> SyncResult<Challenge> {
        (**self).flat_challenge()
    }

    fn generate_session(&self, request: &SessionRequest) -> SyncResult<SessionToken> {
        (**self).generate_session(request)
    }

    fn comment_meta(&self, start_id: u64, session: &SessionToken) -> SyncResult<CommentMetaPage> {
        (**self).comment_meta(start_id, session)
    }

    fn comment_bodies(&self, start_id: u64, session: &SessionToken) -> SyncResult<CommentBodyPage> {
        (**self).comment_bodies(start_id, session)
    }
}

/// One remote call observed by the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// An XML-RPC challenge request.
    GetChallenge,
    /// A `syncitems` request with its cursor value.
    SyncItems(String),
    /// A `getevents` request with its item id.
    GetEvent(u64),
    /// A flat challenge request.
    FlatChallenge,
    /// A session generation request.
    GenerateSession,
    /// A metadata page request with its start id.
    CommentMeta(u64),
    /// A body page request with its start id.
    CommentBodies(u64),
}

/// A scripted transport for testing.
///
/// Responses are queued per method and handed out in order; every call
/// is recorded so tests can assert the exact request sequence (cursor
/// values, start ids, call counts).
#[derive(Debug, Default)]
pub struct MockTransport {
    challenge_counter: Mutex<u64>,
    sync_items: Mutex<VecDeque<SyncResult<SyncItemsPage>>>,
    events: Mutex<VecDeque<SyncResult<Option<RawPost>>>>,
    sessions: Mutex<VecDeque<SyncResult<SessionToken>>>,
    meta_pages: Mutex<VecDeque<SyncResult<CommentMetaPage>>>,
    body_pages: Mutex<VecDeque<SyncResult<CommentBodyPage>>>,
    calls: Mutex<Vec<TransportCall>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a `syncitems` response.
    pub fn push_sync_items(&self, response: SyncResult<SyncItemsPage>) {
        self.sync_items.lock().unwrap().push_back(response);
    }

    /// Queues a `getevents` response.
    pub fn push_event(&self, response: SyncResult<Option<RawPost>>) {
        self.events.lock().unwrap().push_back(response);
    }

    /// Queues a session generation response.
    pub fn push_session(&self, response: SyncResult<SessionToken>) {
        self.sessions.lock().unwrap().push_back(response);
    }

    /// Queues a metadata page response.
    pub fn push_meta_page(&self, response: SyncResult<CommentMetaPage>) {
        self.meta_pages.lock().unwrap().push_back(response);
    }

    /// Queues a body page response.
    pub fn push_body_page(&self, response: SyncResult<CommentBodyPage>) {
        self.body_pages.lock().unwrap().push_back(response);
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many calls matched the given predicate.
    pub fn count_calls(&self, predicate: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_challenge(&self) -> Challenge {
        let mut counter = self.challenge_counter.lock().unwrap();
        *counter += 1;
        Challenge(format!("c0:mock:{counter}"))
    }

    fn pop<T>(queue: &Mutex<VecDeque<SyncResult<T>>>, what: &str) -> SyncResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::transport_fatal(format!("no scripted {what}"))))
    }
}

impl SyncTransport for MockTransport {
    fn get_challenge(&self) -> SyncResult<Challenge> {
        self.record(TransportCall::GetChallenge);
        Ok(self.next_challenge())
    }

    fn sync_items(&self, request: &SyncItemsRequest) -> SyncResult<SyncItemsPage> {
        self.record(TransportCall::SyncItems(request.last_sync.clone()));
        Self::pop(&self.sync_items, "syncitems response")
    }

    fn get_event(&self, request: &GetEventRequest) -> SyncResult<Option<RawPost>> {
        self.record(TransportCall::GetEvent(request.item_id));
        Self::pop(&self.events, "getevents response")
    }

    fn flat_challenge(&self) -> SyncResult<Challenge> {
        self.record(TransportCall::FlatChallenge);
        Ok(self.next_challenge())
    }

    fn generate_session(&self, _request: &SessionRequest) -> SyncResult<SessionToken> {
        self.record(TransportCall::GenerateSession);
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.pop_front() {
            Some(response) => response,
            // Default to a fixed token so tests only script failures
            None => Ok(SessionToken("v1:mock".into())),
        }
    }

    fn comment_meta(
        &self,
        start_id: u64,
        _session: &SessionToken,
    ) -> SyncResult<CommentMetaPage> {
        self.record(TransportCall::CommentMeta(start_id));
        Self::pop(&self.meta_pages, "comment metadata page")
    }

    fn comment_bodies(
        &self,
        start_id: u64,
        _session: &SessionToken,
    ) -> SyncResult<CommentBodyPage> {
        self.record(TransportCall::CommentBodies(start_id));
        Self::pop(&self.body_pages, "comment body page")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_calls_in_order() {
        let transport = MockTransport::new();
        transport.push_sync_items(Ok(SyncItemsPage::default()));

        let challenge = transport.get_challenge().unwrap();
        let request = SyncItemsRequest {
            username: "frank".into(),
            last_sync: String::new(),
            response: "digest".into(),
            challenge,
        };
        transport.sync_items(&request).unwrap();

        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::GetChallenge,
                TransportCall::SyncItems(String::new()),
            ]
        );
    }

    #[test]
    fn unscripted_response_fails_fatally() {
        let transport = MockTransport::new();
        let challenge = transport.get_challenge().unwrap();
        let request = GetEventRequest {
            username: "frank".into(),
            item_id: 7,
            response: "digest".into(),
            challenge,
        };
        let err = transport.get_event(&request).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn challenges_are_unique() {
        let transport = MockTransport::new();
        let a = transport.get_challenge().unwrap();
        let b = transport.flat_challenge().unwrap();
        assert_ne!(a, b);
    }
}
