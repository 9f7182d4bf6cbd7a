//! Encoder and decoder for `graphql-transport-ws` frames.
//!
//! Each WebSocket text message holds exactly one JSON envelope, so unlike a
//! byte-stream protocol there is no buffering: one message in, one envelope
//! out.

use crate::envelope::{Envelope, MessageKind};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope as it appears on the wire.
#[derive(Debug, Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    msg_type: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

/// Inbound envelope; every field is optional so missing ones get a precise error.
#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    msg_type: Option<String>,

    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    payload: Option<Value>,
}

/// Encodes envelopes into wire text.
pub struct Encoder;

impl Encoder {
    /// Encodes an envelope into a JSON text frame.
    pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
        let wire = WireEnvelope {
            msg_type: envelope.kind().as_str(),
            id: envelope.id(),
            payload: envelope.payload(),
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

/// Decodes wire text into envelopes.
pub struct Decoder;

impl Decoder {
    /// Decodes one text frame.
    pub fn decode(text: &str) -> Result<Envelope, ProtocolError> {
        let inbound: InboundEnvelope = serde_json::from_str(text)?;

        let tag = inbound.msg_type.ok_or(ProtocolError::MissingField("type"))?;
        let kind = MessageKind::from_tag(&tag).ok_or(ProtocolError::UnknownType(tag))?;

        if kind.requires_id() {
            match inbound.id.as_deref() {
                None => return Err(ProtocolError::MissingField("id")),
                Some("") => return Err(ProtocolError::EmptyId(kind.as_str())),
                Some(_) => {}
            }
        }

        Ok(Envelope::from_parts(kind, inbound.id, inbound.payload))
    }

    /// Decodes one binary frame (UTF-8 JSON).
    pub fn decode_bytes(bytes: &[u8]) -> Result<Envelope, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::decode(text)
    }
}
