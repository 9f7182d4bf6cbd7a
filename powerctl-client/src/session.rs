//! Transport session: one WebSocket connection carrying JSON envelopes.

use crate::error::SessionError;
use crate::tls::{create_connector, TlsClientConfig};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use powerctl_protocol::{Decoder, Encoder, Envelope, LIVE_ENDPOINT, SUBPROTOCOL, USER_AGENT};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::http::header::{self, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A bidirectional envelope channel.
///
/// The subscription machinery only talks to this trait, so it can be driven
/// by an in-memory fake in tests.
#[async_trait]
pub trait Transport: Send {
    /// Encodes and sends one envelope.
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SessionError>;

    /// Receives the next envelope.
    ///
    /// With a deadline, returns [`SessionError::Timeout`] if nothing arrives
    /// in time; the session stays usable. A frame that fails to decode yields
    /// [`SessionError::Decode`] and the session also stays usable.
    async fn receive(&mut self, deadline: Option<Duration>) -> Result<Envelope, SessionError>;

    /// Closes the session. Idempotent; never fails.
    async fn close(&mut self, reason: &str);
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// `ws://` or `wss://` URL.
    pub endpoint: String,
    /// Dial plus upgrade timeout.
    pub connect_timeout: Duration,
    /// Upper bound on the close handshake.
    pub close_timeout: Duration,
    pub tls: TlsClientConfig,
}

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
            tls: TlsClientConfig::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_tls(mut self, tls: TlsClientConfig) -> Self {
        self.tls = tls;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(LIVE_ENDPOINT)
    }
}

/// WebSocket session negotiated for `graphql-transport-ws`.
pub struct WsSession {
    config: SessionConfig,
    stream: Option<WsStream>,
    state: SessionState,
}

impl WsSession {
    /// Creates a session in the `Connecting` state, not yet dialed.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stream: None,
            state: SessionState::Connecting,
        }
    }

    /// Creates a session and connects it.
    pub async fn open(config: &SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self::new(config.clone());
        session.connect().await?;
        Ok(session)
    }

    /// Dials the endpoint and performs the WebSocket upgrade.
    ///
    /// Fails with [`SessionError::SubprotocolRejected`] if the server does
    /// not select `graphql-transport-ws`. On any failure the session ends
    /// up `Closed`.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::Connect(format!(
                "session is {:?}, not connecting",
                self.state
            )));
        }

        let (stream, negotiated) = match self.dial().await {
            Ok(dialed) => dialed,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e);
            }
        };
        self.stream = Some(stream);

        if negotiated.as_deref() != Some(SUBPROTOCOL) {
            self.close("unsupported subprotocol").await;
            return Err(SessionError::SubprotocolRejected {
                expected: SUBPROTOCOL,
                negotiated,
            });
        }

        self.state = SessionState::Open;
        tracing::debug!("Connected to {}", self.config.endpoint);
        Ok(())
    }

    /// Returns the upgraded stream and the subprotocol the server selected.
    async fn dial(&self) -> Result<(WsStream, Option<String>), SessionError> {
        let config = &self.config;
        tracing::debug!("Connecting to {}...", config.endpoint);

        let mut request = config
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(SUBPROTOCOL),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        let connector = create_connector(&config.tls)?;
        let connect = tokio_tungstenite::connect_async_tls_with_config(
            request,
            None,
            false,
            Some(connector),
        );
        let (stream, response) = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| SessionError::ConnectTimeout)?
            .map_err(|e| match e {
                // tungstenite checks the echoed subprotocol during the upgrade
                tungstenite::Error::Protocol(ProtocolError::SecWebSocketSubProtocolError(_)) => {
                    SessionError::SubprotocolRejected {
                        expected: SUBPROTOCOL,
                        negotiated: None,
                    }
                }
                other => SessionError::Connect(other.to_string()),
            })?;

        let negotiated = response
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok((stream, negotiated))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    async fn next_envelope(stream: &mut WsStream) -> Result<Envelope, SessionError> {
        loop {
            let Some(message) = stream.next().await else {
                return Err(SessionError::Closed);
            };
            match message? {
                Message::Text(text) => {
                    return Decoder::decode(text.as_str()).map_err(SessionError::Decode)
                }
                Message::Binary(bytes) => {
                    return Decoder::decode_bytes(&bytes).map_err(SessionError::Decode)
                }
                Message::Close(frame) => {
                    tracing::debug!(?frame, "server closed the connection");
                    return Err(SessionError::Closed);
                }
                // Control frames are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

#[async_trait]
impl Transport for WsSession {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        let text = Encoder::encode(envelope).map_err(SessionError::Encode)?;
        let stream = self.stream.as_mut().ok_or(SessionError::Closed)?;
        tracing::trace!(kind = %envelope.kind(), "sending frame");
        stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn receive(&mut self, deadline: Option<Duration>) -> Result<Envelope, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::Closed)?;
        let envelope = match deadline {
            Some(deadline) => tokio::time::timeout(deadline, Self::next_envelope(stream))
                .await
                .map_err(|_| SessionError::Timeout)??,
            None => Self::next_envelope(stream).await?,
        };
        tracing::trace!(kind = %envelope.kind(), id = ?envelope.id(), "received frame");
        Ok(envelope)
    }

    async fn close(&mut self, reason: &str) {
        let Some(mut stream) = self.stream.take() else {
            self.state = SessionState::Closed;
            return;
        };
        self.state = SessionState::Closing;

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        };
        match tokio::time::timeout(self.config.close_timeout, stream.close(Some(frame))).await {
            Ok(Ok(())) => tracing::debug!("Connection closed ({})", reason),
            Ok(Err(e)) => tracing::debug!("Close handshake failed: {}", e),
            Err(_) => tracing::debug!("Close handshake timed out"),
        }
        self.state = SessionState::Closed;
    }
}
