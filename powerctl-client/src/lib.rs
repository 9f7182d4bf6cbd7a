//! # powerctl-client
//!
//! Client library for powerctl.
//!
//! This crate provides:
//! - A `graphql-transport-ws` session over tokio-tungstenite, behind the
//!   [`Transport`] trait
//! - The `connection_init` handshake and a single-subscription controller
//! - [`LiveClient`], which streams live telemetry with cancellation and
//!   guaranteed cleanup
//! - [`GraphQlClient`] for one-shot HTTP queries (homes, prices)

pub mod cancel;
pub mod error;
pub mod graphql;
pub mod handshake;
pub mod live;
pub mod session;
pub mod subscription;
pub mod tls;

#[cfg(test)]
mod mock;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use error::{ClientError, HandshakeError, LiveError, SessionError};
pub use graphql::GraphQlClient;
pub use handshake::perform_init;
pub use live::{mask_token, Credentials, LiveClient, LiveConfig};
pub use session::{SessionConfig, SessionState, Transport, WsSession};
pub use subscription::{StopError, SubscriptionController, SubscriptionState, Termination};
pub use tls::TlsClientConfig;
