//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding a server response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A field the protocol requires was absent from the response.
    #[error("missing field `{0}` in response")]
    MissingField(&'static str),

    /// The response was structurally invalid.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The server returned an XML-RPC fault.
    #[error("server fault {code}: {message}")]
    Fault {
        /// Numeric fault code.
        code: i64,
        /// Human-readable fault string.
        message: String,
    },

    /// The response was not well-formed XML.
    #[error("xml error: {0}")]
    Xml(String),
}

impl ProtocolError {
    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Returns true if this error indicates rejected credentials.
    ///
    /// Fault 100 is "unknown user", fault 101 is "invalid password".
    /// These are surfaced immediately instead of being retried.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ProtocolError::Fault { code: 100 | 101, .. })
    }
}

impl From<quick_xml::Error> for ProtocolError {
    fn from(err: quick_xml::Error) -> Self {
        ProtocolError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ProtocolError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ProtocolError::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_faults_recognized() {
        let err = ProtocolError::Fault {
            code: 101,
            message: "Invalid password".into(),
        };
        assert!(err.is_auth_failure());

        let err = ProtocolError::Fault {
            code: 100,
            message: "Unknown user".into(),
        };
        assert!(err.is_auth_failure());

        let err = ProtocolError::Fault {
            code: 500,
            message: "Internal error".into(),
        };
        assert!(!err.is_auth_failure());
        assert!(!ProtocolError::MissingField("challenge").is_auth_failure());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::MissingField("challenge");
        assert_eq!(err.to_string(), "missing field `challenge` in response");
    }
}
