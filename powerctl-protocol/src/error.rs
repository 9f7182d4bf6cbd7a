//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding protocol messages.
///
/// None of these are fatal to a session: a frame that fails to decode is
/// skipped and reading continues.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8 in frame")]
    InvalidUtf8,

    #[error("unknown message type: {0:?}")]
    UnknownType(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("empty id on {0} message")]
    EmptyId(&'static str),

    #[error("payload has no {0} data")]
    MissingData(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownType("hello".to_string());
        assert!(err.to_string().contains("hello"));

        let err = ProtocolError::MissingField("id");
        assert_eq!(err.to_string(), "missing required field: id");

        let err = ProtocolError::EmptyId("next");
        assert!(err.to_string().contains("next"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));

        let err = ProtocolError::MissingData("liveMeasurement");
        assert!(err.to_string().contains("liveMeasurement"));
    }
}
