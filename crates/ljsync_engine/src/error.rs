//! Error types for the sync engine.

use ljsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync run.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Protocol or shape error (missing field, unparseable page).
    ///
    /// Retried the same way transport errors are.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The host rejected the credentials.
    ///
    /// Surfaced immediately, never retried; further attempts with the
    /// same credentials are guaranteed to fail.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The retry budget for an operation was exhausted.
    #[error("giving up after {attempts} failed attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last error observed.
        last: String,
    },

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// A timestamp could not be normalized.
    #[error("bad timestamp: {0}")]
    Time(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Protocol(err) => !err.is_auth_failure(),
            _ => false,
        }
    }
}
