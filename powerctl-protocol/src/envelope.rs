//! Envelope model for the `graphql-transport-ws` protocol.
//!
//! Every frame on the live socket is one envelope:
//!
//! ```text
//! { "type": "<tag>", "id": "<subscription id>", "payload": { ... } }
//! ```
//!
//! `id` is carried by subscription-scoped messages (`subscribe`, `next`,
//! `error`, `complete`) and never by connection-scoped ones. The payload is
//! kept as raw JSON here; it is decoded into a typed structure only once the
//! kind is known (see [`crate::message`]).

use crate::error::ProtocolError;
use serde_json::Value;
use std::fmt;

/// Message types recognized on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Connection scoped
    ConnectionInit,
    ConnectionAck,
    Ping,
    Pong,

    // Subscription scoped
    Subscribe,
    Next,
    Error,
    Complete,
}

impl MessageKind {
    /// All kinds, in wire-tag order.
    pub const ALL: [MessageKind; 8] = [
        MessageKind::ConnectionInit,
        MessageKind::ConnectionAck,
        MessageKind::Ping,
        MessageKind::Pong,
        MessageKind::Subscribe,
        MessageKind::Next,
        MessageKind::Error,
        MessageKind::Complete,
    ];

    /// Returns the `type` tag used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::ConnectionInit => "connection_init",
            MessageKind::ConnectionAck => "connection_ack",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::Subscribe => "subscribe",
            MessageKind::Next => "next",
            MessageKind::Error => "error",
            MessageKind::Complete => "complete",
        }
    }

    /// Parses a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Returns whether messages of this kind must carry a subscription id.
    pub fn requires_id(&self) -> bool {
        matches!(
            self,
            MessageKind::Subscribe | MessageKind::Next | MessageKind::Error | MessageKind::Complete
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed protocol message.
///
/// Fields are private. Connection-scoped constructors never set an id;
/// subscription-scoped ones return an error for an empty id, so an
/// `Envelope` in hand always encodes to a frame the decoder accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    kind: MessageKind,
    id: Option<String>,
    payload: Option<Value>,
}

impl Envelope {
    /// `connection_init` carrying the given payload.
    pub fn connection_init(payload: Option<Value>) -> Self {
        Self::connection_scoped(MessageKind::ConnectionInit, payload)
    }

    /// `connection_ack`, optionally with a server payload.
    pub fn connection_ack(payload: Option<Value>) -> Self {
        Self::connection_scoped(MessageKind::ConnectionAck, payload)
    }

    pub fn ping(payload: Option<Value>) -> Self {
        Self::connection_scoped(MessageKind::Ping, payload)
    }

    pub fn pong(payload: Option<Value>) -> Self {
        Self::connection_scoped(MessageKind::Pong, payload)
    }

    /// `subscribe` for subscription `id`.
    pub fn subscribe(id: impl Into<String>, payload: Value) -> Result<Self, ProtocolError> {
        Self::subscription_scoped(MessageKind::Subscribe, id, Some(payload))
    }

    /// `next` for subscription `id`.
    pub fn next(id: impl Into<String>, payload: Value) -> Result<Self, ProtocolError> {
        Self::subscription_scoped(MessageKind::Next, id, Some(payload))
    }

    /// `error` for subscription `id`.
    pub fn error(id: impl Into<String>, payload: Value) -> Result<Self, ProtocolError> {
        Self::subscription_scoped(MessageKind::Error, id, Some(payload))
    }

    /// `complete` for subscription `id`.
    pub fn complete(id: impl Into<String>) -> Result<Self, ProtocolError> {
        Self::subscription_scoped(MessageKind::Complete, id, None)
    }

    fn connection_scoped(kind: MessageKind, payload: Option<Value>) -> Self {
        Self {
            kind,
            id: None,
            payload: normalize(payload),
        }
    }

    // The decoder refuses empty ids, so they are refused here too.
    fn subscription_scoped(
        kind: MessageKind,
        id: impl Into<String>,
        payload: Option<Value>,
    ) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::EmptyId(kind.as_str()));
        }
        Ok(Self {
            kind,
            id: Some(id),
            payload: normalize(payload),
        })
    }

    /// Builds an envelope from already-validated parts.
    ///
    /// Used by the decoder after it has checked the id rules.
    pub(crate) fn from_parts(kind: MessageKind, id: Option<String>, payload: Option<Value>) -> Self {
        let id = if kind.requires_id() { id } else { None };
        Self {
            kind,
            id,
            payload: normalize(payload),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Consumes the envelope, returning its payload.
    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }

    /// Returns whether this message belongs to subscription `id`.
    pub fn is_for(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

// JSON `null` and "no payload" are the same thing on the wire.
fn normalize(payload: Option<Value>) -> Option<Value> {
    payload.filter(|value| !value.is_null())
}
