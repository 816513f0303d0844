//! HTTP-backed [`SyncTransport`] implementation.
//!
//! The actual HTTP stack is behind the [`HttpClient`] seam so the
//! transport logic (URLs, bodies, response decoding) stays testable
//! without a network.

use crate::error::{SyncError, SyncResult};
use crate::transport::{
    GetEventRequest, SessionRequest, SessionToken, SyncItemsRequest, SyncTransport,
};
use ljsync_protocol::{
    decode_response, encode_call, Challenge, CommentBodyPage, CommentMetaPage, FlatResponse,
    ProtocolError, RawPost, SyncItemsPage, Value,
};

/// One outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request body; present for POST, absent for GET.
    pub body: Option<Vec<u8>>,
    /// Content type accompanying the body.
    pub content_type: Option<&'static str>,
    /// Cookie header value, if any.
    pub cookie: Option<String>,
}

impl HttpRequest {
    /// Builds a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
            content_type: None,
            cookie: None,
        }
    }

    /// Builds a POST request with the given body.
    pub fn post(url: impl Into<String>, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
            content_type: Some(content_type),
            cookie: None,
        }
    }

    /// Attaches a cookie header.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

/// Executes HTTP requests. Implemented over a concrete client by the
/// binary; implemented over canned responses in tests.
pub trait HttpClient: Send + Sync {
    /// Executes one request and returns the response body.
    ///
    /// Errors are plain strings; the transport wraps them as retryable
    /// transport failures.
    fn execute(&self, request: &HttpRequest) -> Result<Vec<u8>, String>;
}

/// [`SyncTransport`] over a live journal host.
pub struct HttpTransport<C: HttpClient> {
    host: String,
    client: C,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport for the given host, e.g. `livejournal.com`.
    pub fn new(host: impl Into<String>, client: C) -> Self {
        Self {
            host: host.into(),
            client,
        }
    }

    fn rpc_url(&self) -> String {
        format!("http://{}/interface/xmlrpc", self.host)
    }

    fn flat_url(&self) -> String {
        format!("http://{}/interface/flat", self.host)
    }

    fn execute(&self, request: &HttpRequest) -> SyncResult<Vec<u8>> {
        self.client
            .execute(request)
            .map_err(SyncError::transport_retryable)
    }

    /// Issues one XML-RPC call and decodes the response value.
    fn call(&self, method: &str, params: &[Value]) -> SyncResult<Value> {
        let body = encode_call(method, params);
        tracing::trace!(method, "xml-rpc call");
        let response = self.execute(&HttpRequest::post(
            self.rpc_url(),
            "text/xml",
            body.into_bytes(),
        ))?;
        decode_response(&response).map_err(map_protocol)
    }

    /// Issues one flat-surface POST and decodes the key/value reply.
    fn flat(&self, body: String) -> SyncResult<FlatResponse> {
        let response = self.execute(&HttpRequest::post(
            self.flat_url(),
            "application/x-www-form-urlencoded",
            body.into_bytes(),
        ))?;
        Ok(FlatResponse::decode(&String::from_utf8_lossy(&response)))
    }

    /// Fetches one comment-export page with the session cookie.
    fn export(&self, what: &str, start_id: u64, session: &SessionToken) -> SyncResult<Vec<u8>> {
        let url = format!(
            "http://{}/export_comments.bml?get={what}&startid={start_id}",
            self.host
        );
        self.execute(&HttpRequest::get(url).with_cookie(format!("ljsession={}", session.0)))
    }
}

/// Authentication faults surface as credential rejection; everything
/// else stays a protocol error.
fn map_protocol(err: ProtocolError) -> SyncError {
    if err.is_auth_failure() {
        SyncError::AuthenticationFailed(err.to_string())
    } else {
        SyncError::Protocol(err)
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn get_challenge(&self) -> SyncResult<Challenge> {
        let value = self.call("LJ.XMLRPC.getchallenge", &[])?;
        let challenge = value
            .get("challenge")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("challenge"))?;
        Ok(Challenge(challenge.to_string()))
    }

    fn sync_items(&self, request: &SyncItemsRequest) -> SyncResult<SyncItemsPage> {
        let params = Value::structure(vec![
            ("username", Value::String(request.username.clone())),
            ("ver", Value::Int(1)),
            ("lastsync", Value::String(request.last_sync.clone())),
            ("auth_method", Value::String("challenge".into())),
            ("auth_challenge", Value::String(request.challenge.0.clone())),
            ("auth_response", Value::String(request.response.clone())),
        ]);
        let value = self.call("LJ.XMLRPC.syncitems", &[params])?;
        Ok(SyncItemsPage::from_value(&value)?)
    }

    fn get_event(&self, request: &GetEventRequest) -> SyncResult<Option<RawPost>> {
        let params = Value::structure(vec![
            ("username", Value::String(request.username.clone())),
            ("ver", Value::Int(1)),
            ("selecttype", Value::String("one".into())),
            ("itemid", Value::Int(request.item_id as i64)),
            ("auth_method", Value::String("challenge".into())),
            ("auth_challenge", Value::String(request.challenge.0.clone())),
            ("auth_response", Value::String(request.response.clone())),
        ]);
        let value = self.call("LJ.XMLRPC.getevents", &[params])?;
        let events = value
            .get("events")
            .and_then(Value::as_array)
            .ok_or(ProtocolError::MissingField("events"))?;
        match events.first() {
            Some(event) => Ok(Some(RawPost::from_value(event)?)),
            None => Ok(None),
        }
    }

    fn flat_challenge(&self) -> SyncResult<Challenge> {
        let response = self.flat("mode=getchallenge".to_string())?;
        if let Some(message) = response.error_message() {
            return Err(SyncError::AuthenticationFailed(message.to_string()));
        }
        let challenge = response.require("challenge").map_err(map_protocol)?;
        Ok(Challenge(challenge.to_string()))
    }

    fn generate_session(&self, request: &SessionRequest) -> SyncResult<SessionToken> {
        let body = format!(
            "mode=sessiongenerate&auth_method=challenge&user={}&auth_challenge={}&auth_response={}",
            request.username, request.challenge.0, request.response
        );
        let response = self.flat(body)?;
        if let Some(message) = response.error_message() {
            return Err(SyncError::AuthenticationFailed(message.to_string()));
        }
        let session = response.require("ljsession").map_err(map_protocol)?;
        Ok(SessionToken(session.to_string()))
    }

    fn comment_meta(
        &self,
        start_id: u64,
        session: &SessionToken,
    ) -> SyncResult<CommentMetaPage> {
        let body = self.export("comment_meta", start_id, session)?;
        Ok(CommentMetaPage::parse(&body)?)
    }

    fn comment_bodies(
        &self,
        start_id: u64,
        session: &SessionToken,
    ) -> SyncResult<CommentBodyPage> {
        let body = self.export("comment_body", start_id, session)?;
        Ok(CommentBodyPage::parse(&body)?)
    }
}
