//! Subscription controller.
//!
//! Drives a single subscription over an initialised session: sends
//! `subscribe`, then delivers decoded telemetry to the consumer until the
//! server completes or fails the subscription, the transport dies, the
//! consumer stops, or cancellation is requested.

use crate::cancel::CancelSignal;
use crate::error::SessionError;
use crate::session::Transport;
use powerctl_protocol::message::{decode_telemetry, error_message};
use powerctl_protocol::{Envelope, GraphQlRequest, MessageKind, TelemetryRecord, SUBSCRIPTION_ID};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How often the receive loop wakes up to re-check cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Returned by a consumer to end the stream early.
#[derive(Debug, Error)]
#[error("consumer stopped the stream: {reason}")]
pub struct StopError {
    #[source]
    reason: Box<dyn StdError + Send + Sync>,
}

impl StopError {
    pub fn new(reason: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.reason.as_ref()
    }
}

/// Why a subscription ended.
#[derive(Debug)]
pub enum Termination {
    /// The server sent `complete`.
    Completed,
    /// Cancellation was requested.
    Cancelled,
    /// The server sent `error`; carries its message text.
    RemoteError(String),
    /// The session failed.
    TransportError(SessionError),
    /// The consumer returned an error.
    Stopped(StopError),
}

impl Termination {
    /// Completed and cancelled streams count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::Completed | Termination::Cancelled)
    }

    /// Short label, also used as the close reason.
    pub fn label(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::Cancelled => "cancelled",
            Termination::RemoteError(_) => "remote error",
            Termination::TransportError(_) => "transport error",
            Termination::Stopped(_) => "stopped by consumer",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::RemoteError(message) => write!(f, "subscription error: {}", message),
            Termination::TransportError(e) => write!(f, "connection lost: {}", e),
            Termination::Stopped(e) => write!(f, "{}", e),
            other => f.write_str(other.label()),
        }
    }
}

/// Lifecycle of the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unregistered,
    Active,
    Terminated,
}

/// Runs one subscription over a borrowed session.
pub struct SubscriptionController<'a, T: Transport + ?Sized> {
    session: &'a mut T,
    id: String,
    poll_interval: Duration,
    state: SubscriptionState,
    delivered: u64,
    skipped: u64,
}

impl<'a, T: Transport + ?Sized> SubscriptionController<'a, T> {
    pub fn new(session: &'a mut T) -> Self {
        Self {
            session,
            id: SUBSCRIPTION_ID.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: SubscriptionState::Unregistered,
            delivered: 0,
            skipped: 0,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Subscribes to live measurements for `target_id` and streams them to
    /// `consumer` in arrival order.
    ///
    /// Undecodable frames are skipped. Frames for other subscription ids are
    /// ignored. `ping` is answered with `pong`. Does not close the session.
    pub async fn run<F>(mut self, target_id: &str, consumer: F, cancel: &CancelSignal) -> Termination
    where
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        let termination = self.drive(target_id, consumer, cancel).await;
        self.transition(SubscriptionState::Terminated);
        tracing::debug!(
            delivered = self.delivered,
            skipped = self.skipped,
            "Subscription ended: {}",
            termination.label()
        );
        termination
    }

    async fn drive<F>(&mut self, target_id: &str, mut consumer: F, cancel: &CancelSignal) -> Termination
    where
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        let subscribe = match GraphQlRequest::live_measurement(target_id).into_subscribe(&self.id) {
            Ok(envelope) => envelope,
            Err(e) => return Termination::TransportError(SessionError::Encode(e)),
        };
        if let Err(e) = self.session.send(&subscribe).await {
            return Termination::TransportError(e);
        }
        self.transition(SubscriptionState::Active);
        tracing::info!("Subscribed to live measurements for home {}", target_id);

        loop {
            if cancel.is_cancelled() {
                return Termination::Cancelled;
            }

            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Termination::Cancelled,
                received = self.session.receive(Some(self.poll_interval)) => received,
            };

            let envelope = match received {
                Ok(envelope) => envelope,
                Err(SessionError::Timeout) => continue,
                Err(e) if e.is_recoverable() => {
                    self.skipped += 1;
                    tracing::warn!("Skipping undecodable frame: {}", e);
                    continue;
                }
                Err(e) => return Termination::TransportError(e),
            };

            if let Some(termination) = self.dispatch(envelope, &mut consumer).await {
                return termination;
            }
        }
    }

    async fn dispatch<F>(&mut self, envelope: Envelope, consumer: &mut F) -> Option<Termination>
    where
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        let ours = envelope.is_for(&self.id);
        match envelope.kind() {
            MessageKind::Next if ours => {
                let record = envelope
                    .payload()
                    .ok_or(powerctl_protocol::ProtocolError::MissingField("payload"))
                    .and_then(decode_telemetry);
                match record {
                    Ok(record) => {
                        self.delivered += 1;
                        if let Err(stop) = consumer(record) {
                            return Some(Termination::Stopped(stop));
                        }
                    }
                    Err(e) => {
                        self.skipped += 1;
                        tracing::warn!("Skipping measurement: {}", e);
                    }
                }
                None
            }
            MessageKind::Error if ours => {
                Some(Termination::RemoteError(error_message(envelope.payload())))
            }
            MessageKind::Complete if ours => Some(Termination::Completed),
            MessageKind::Ping => match self.session.send(&Envelope::pong(None)).await {
                Ok(()) => None,
                Err(e) => Some(Termination::TransportError(e)),
            },
            kind => {
                tracing::debug!(%kind, id = ?envelope.id(), "Ignoring frame");
                None
            }
        }
    }

    fn transition(&mut self, next: SubscriptionState) {
        tracing::trace!(from = ?self.state, to = ?next, "Subscription state");
        self.state = next;
    }
}
