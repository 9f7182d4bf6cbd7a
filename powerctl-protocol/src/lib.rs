//! # powerctl-protocol
//!
//! Wire protocol implementation for powerctl.
//!
//! This crate provides:
//! - `graphql-transport-ws` envelope types and the JSON frame codec
//! - Typed payloads for init, subscribe, next and error messages
//! - GraphQL documents for the Tibber API
//! - Domain models (homes, prices, live telemetry)

pub mod codec;
pub mod envelope;
pub mod error;
pub mod message;
pub mod models;
pub mod query;

pub use codec::{Decoder, Encoder};
pub use envelope::{Envelope, MessageKind};
pub use error::ProtocolError;
pub use message::{GraphQlError, GraphQlRequest, GraphQlResponse, InitPayload};
pub use models::{
    Address, Features, Home, HomeSubscription, Price, PriceInfo, PriceLevel, TelemetryRecord,
};

/// WebSocket subprotocol negotiated with the live endpoint.
pub const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Client identification sent as `User-Agent` on every connection.
pub const USER_AGENT: &str = "powerctl-cli/1.0";

/// Live subscription endpoint.
pub const LIVE_ENDPOINT: &str = "wss://websocket-api.tibber.com/v1-beta/gql/subscriptions";

/// One-shot GraphQL endpoint.
pub const GRAPHQL_ENDPOINT: &str = "https://api.tibber.com/v1-beta/gql";

/// Id of the single subscription opened per connection.
pub const SUBSCRIPTION_ID: &str = "1";
