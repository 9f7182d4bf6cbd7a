//! Client error types.

use powerctl_protocol::{MessageKind, ProtocolError};
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by a transport session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error(
        "subprotocol rejected: expected {expected}, server selected {}",
        .negotiated.as_deref().unwrap_or("none")
    )]
    SubprotocolRejected {
        expected: &'static str,
        negotiated: Option<String>,
    },

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("receive timeout")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to encode frame: {0}")]
    Encode(ProtocolError),

    #[error("undecodable frame: {0}")]
    Decode(ProtocolError),
}

impl SessionError {
    /// Returns whether the session is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Timeout | SessionError::Decode(_))
    }
}

impl From<tungstenite::Error> for SessionError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                SessionError::Closed
            }
            other => SessionError::Transport(other.to_string()),
        }
    }
}

/// Errors from the `connection_init` / `connection_ack` exchange.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("failed to send connection_init: {0}")]
    Send(SessionError),

    #[error("no connection_ack within {0:?}")]
    Timeout(Duration),

    #[error("expected connection_ack, got {0}")]
    UnexpectedMessage(MessageKind),

    #[error("connection closed before connection_ack")]
    Closed,

    #[error("failed to parse connection_ack: {0}")]
    Malformed(ProtocolError),

    #[error("failed to read connection_ack: {0}")]
    Transport(SessionError),
}

/// Fatal errors of a live stream, raised before the subscription starts.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("failed to connect: {0}")]
    Connect(SessionError),

    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

/// Errors of the one-shot GraphQL client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("response contained no data")]
    MissingData,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no price information found")]
    NoPriceInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_recoverable() {
        assert!(SessionError::Timeout.is_recoverable());
        assert!(SessionError::Decode(ProtocolError::InvalidUtf8).is_recoverable());

        assert!(!SessionError::Closed.is_recoverable());
        assert!(!SessionError::Transport("reset".to_string()).is_recoverable());
        assert!(!SessionError::Connect("refused".to_string()).is_recoverable());
    }

    #[test]
    fn test_from_tungstenite() {
        let err: SessionError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, SessionError::Closed));

        let err: SessionError = tungstenite::Error::AlreadyClosed.into();
        assert!(matches!(err, SessionError::Closed));

        let err: SessionError = tungstenite::Error::AttackAttempt.into();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::SubprotocolRejected {
            expected: "graphql-transport-ws",
            negotiated: None,
        };
        assert_eq!(
            err.to_string(),
            "subprotocol rejected: expected graphql-transport-ws, server selected none"
        );

        let err = HandshakeError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "no connection_ack within 10s");

        let err = HandshakeError::UnexpectedMessage(MessageKind::Next);
        assert_eq!(err.to_string(), "expected connection_ack, got next");

        let err = LiveError::from(HandshakeError::Closed);
        assert!(err.to_string().starts_with("handshake failed"));
    }
}
