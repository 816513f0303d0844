//! Challenge-response authentication over both sync surfaces.
//!
//! Two transport variants share one algorithm: obtain a single-use
//! challenge, answer it with `digest(challenge ++ digest(secret))`.
//! The variant is selected once at construction, not sniffed at
//! runtime.

use crate::error::SyncResult;
use crate::transport::{SessionRequest, SessionToken, SyncTransport};
use ljsync_protocol::{challenge_response, Challenge};

/// The product of one authentication round: a challenge and its
/// computed response, valid for exactly one request.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    /// The server-issued challenge.
    pub challenge: Challenge,
    /// The salted-hash response.
    pub response: String,
}

/// Obtains authentication tokens for one request.
pub trait Authenticator {
    /// Requests a fresh challenge and computes its response.
    ///
    /// Called immediately before each authenticated call; challenges
    /// are never cached or reused.
    fn authenticate(&self) -> SyncResult<AuthTokens>;
}

/// Authenticator for the XML-RPC surface.
pub struct RpcAuthenticator<'a, T: SyncTransport> {
    transport: &'a T,
    secret: &'a str,
}

impl<'a, T: SyncTransport> RpcAuthenticator<'a, T> {
    /// Creates an authenticator over the XML-RPC challenge endpoint.
    pub fn new(transport: &'a T, secret: &'a str) -> Self {
        Self { transport, secret }
    }
}

impl<T: SyncTransport> Authenticator for RpcAuthenticator<'_, T> {
    fn authenticate(&self) -> SyncResult<AuthTokens> {
        let challenge = self.transport.get_challenge()?;
        let response = challenge_response(challenge.as_str(), self.secret);
        Ok(AuthTokens {
            challenge,
            response,
        })
    }
}

/// Authenticator for the flat surface, which additionally exchanges
/// the challenge response for a session token used by the export
/// endpoint.
pub struct SessionAuthenticator<'a, T: SyncTransport> {
    transport: &'a T,
    username: &'a str,
    secret: &'a str,
}

impl<'a, T: SyncTransport> SessionAuthenticator<'a, T> {
    /// Creates an authenticator over the flat challenge endpoint.
    pub fn new(transport: &'a T, username: &'a str, secret: &'a str) -> Self {
        Self {
            transport,
            username,
            secret,
        }
    }

    /// Runs the full session flow: challenge, response, session token.
    ///
    /// A host that rejects the credentials surfaces
    /// [`crate::SyncError::AuthenticationFailed`], which is never
    /// retried.
    pub fn generate_session(&self) -> SyncResult<SessionToken> {
        let tokens = self.authenticate()?;
        self.transport.generate_session(&SessionRequest {
            username: self.username.to_string(),
            challenge: tokens.challenge,
            response: tokens.response,
        })
    }
}

impl<T: SyncTransport> Authenticator for SessionAuthenticator<'_, T> {
    fn authenticate(&self) -> SyncResult<AuthTokens> {
        let challenge = self.transport.flat_challenge()?;
        let response = challenge_response(challenge.as_str(), self.secret);
        Ok(AuthTokens {
            challenge,
            response,
        })
    }
}
