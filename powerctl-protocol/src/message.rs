//! Typed payloads carried inside envelopes and GraphQL HTTP bodies.

use crate::envelope::Envelope;
use crate::error::ProtocolError;
use crate::models::TelemetryRecord;
use crate::query::LIVE_MEASUREMENT_SUBSCRIPTION;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of `connection_init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitPayload {
    /// Bearer token, forwarded verbatim.
    pub token: String,
}

impl InitPayload {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Builds the `connection_init` envelope.
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        Ok(Envelope::connection_init(Some(serde_json::to_value(self)?)))
    }
}

/// A GraphQL operation: used both as the `subscribe` payload and as the
/// body of one-shot HTTP queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// The live measurement subscription for one home.
    pub fn live_measurement(home_id: &str) -> Self {
        Self::new(LIVE_MEASUREMENT_SUBSCRIPTION).with_variable("homeId", home_id)
    }

    /// Builds a `subscribe` envelope for subscription `id`.
    pub fn into_subscribe(self, id: &str) -> Result<Envelope, ProtocolError> {
        Envelope::subscribe(id, serde_json::to_value(self)?)
    }
}

/// One entry of a GraphQL `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// GraphQL execution result: the `next` payload, and the HTTP response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Returns the first error message, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

/// Decodes a `next` payload into a telemetry record.
///
/// The record is nested under `data.liveMeasurement`. A payload whose data
/// is null (typically accompanied by GraphQL errors) does not decode.
pub fn decode_telemetry(payload: &Value) -> Result<TelemetryRecord, ProtocolError> {
    let response: GraphQlResponse = serde_json::from_value(payload.clone())?;
    let measurement = response
        .data
        .as_ref()
        .and_then(|data| data.get("liveMeasurement"))
        .filter(|value| !value.is_null())
        .ok_or(ProtocolError::MissingData("liveMeasurement"))?;
    Ok(TelemetryRecord::deserialize(measurement)?)
}

/// Extracts human-readable text from an `error` payload.
///
/// `graphql-transport-ws` sends a list of GraphQL errors; some servers send a
/// single error object. Anything else is returned as raw JSON text.
pub fn error_message(payload: Option<&Value>) -> String {
    let Some(payload) = payload else {
        return "subscription error without details".to_string();
    };

    if let Ok(errors) = Vec::<GraphQlError>::deserialize(payload) {
        if !errors.is_empty() {
            return errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
        }
    }

    if let Ok(error) = GraphQlError::deserialize(payload) {
        return error.message;
    }

    payload.to_string()
}
