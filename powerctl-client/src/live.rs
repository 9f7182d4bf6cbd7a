//! Live telemetry facade.
//!
//! Composes session, handshake and subscription into a single call and
//! guarantees the session is closed on every exit path once it was opened.

use crate::cancel::CancelSignal;
use crate::error::LiveError;
use crate::handshake::{perform_init, DEFAULT_ACK_TIMEOUT};
use crate::session::{SessionConfig, Transport, WsSession};
use crate::subscription::{StopError, SubscriptionController, Termination, DEFAULT_POLL_INTERVAL};
use crate::tls::TlsClientConfig;
use powerctl_protocol::TelemetryRecord;
use std::fmt;
use std::time::Duration;

/// API token for the live endpoint.
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The token with everything but the first and last four characters hidden.
    pub fn masked(&self) -> String {
        mask_token(&self.token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.masked())
            .finish()
    }
}

/// Masks a secret as `abcd...wxyz`; short secrets are fully hidden.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Live client configuration.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub session: SessionConfig,
    /// How long to wait for `connection_ack`.
    pub ack_timeout: Duration,
    /// Upper bound on cancellation latency while the server is silent.
    pub poll_interval: Duration,
}

impl LiveConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            session: SessionConfig::new(endpoint),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.session.connect_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.session.close_timeout = timeout;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.session.tls = tls;
        self
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Streams live telemetry for one home.
#[derive(Debug, Clone, Default)]
pub struct LiveClient {
    config: LiveConfig,
}

impl LiveClient {
    pub fn new(config: LiveConfig) -> Self {
        Self { config }
    }

    /// Connects, authenticates, subscribes and streams until termination.
    ///
    /// Connection and handshake failures are returned as errors. Everything
    /// after the subscription starts ends in a [`Termination`]. Cancellation
    /// is honoured at every stage, including while dialing.
    pub async fn stream<F>(
        &self,
        credentials: &Credentials,
        target_id: &str,
        consumer: F,
        cancel: &CancelSignal,
    ) -> Result<Termination, LiveError>
    where
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        if cancel.is_cancelled() {
            return Ok(Termination::Cancelled);
        }

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Termination::Cancelled),
            opened = WsSession::open(&self.config.session) => opened,
        };
        let mut session = opened.map_err(LiveError::Connect)?;

        self.stream_on(&mut session, credentials, target_id, consumer, cancel)
            .await
    }

    /// Same as [`stream`](Self::stream), over an already open transport.
    ///
    /// The transport is closed exactly once before returning.
    pub async fn stream_on<T, F>(
        &self,
        session: &mut T,
        credentials: &Credentials,
        target_id: &str,
        consumer: F,
        cancel: &CancelSignal,
    ) -> Result<Termination, LiveError>
    where
        T: Transport + ?Sized,
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        let outcome = self
            .drive(session, credentials, target_id, consumer, cancel)
            .await;

        let reason = match &outcome {
            Ok(termination) => termination.label(),
            Err(_) => "handshake failed",
        };
        session.close(reason).await;

        if let Ok(ref termination) = outcome {
            if termination.is_success() {
                tracing::info!("Live stream ended: {}", termination);
            } else {
                tracing::warn!("Live stream ended: {}", termination);
            }
        }
        outcome
    }

    async fn drive<T, F>(
        &self,
        session: &mut T,
        credentials: &Credentials,
        target_id: &str,
        consumer: F,
        cancel: &CancelSignal,
    ) -> Result<Termination, LiveError>
    where
        T: Transport + ?Sized,
        F: FnMut(TelemetryRecord) -> Result<(), StopError>,
    {
        let handshake = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Termination::Cancelled),
            result = perform_init(&mut *session, credentials.token(), self.config.ack_timeout) => result,
        };
        handshake?;

        let termination = SubscriptionController::new(session)
            .with_poll_interval(self.config.poll_interval)
            .run(target_id, consumer, cancel)
            .await;
        Ok(termination)
    }
}
