//! Test doubles: a scripted in-memory transport and a loopback WebSocket server.

use crate::error::SessionError;
use crate::session::Transport;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use powerctl_protocol::{Decoder, Encoder, Envelope, MessageKind};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// One scripted inbound event.
pub(crate) enum Step {
    Frame(Envelope),
    Raw(&'static str),
    Drop,
}

/// What the transport does once the script is exhausted.
#[derive(Clone, Copy)]
pub(crate) enum Exhausted {
    /// Nothing more arrives; receives time out.
    Silent,
    /// The peer has gone away.
    Closed,
}

/// Shared view into what a [`ScriptedTransport`] was asked to do.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    sent: Arc<Mutex<Vec<Envelope>>>,
    closes: Arc<AtomicUsize>,
}

impl Recorder {
    pub(crate) fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_kinds(&self) -> Vec<MessageKind> {
        self.sent().iter().map(Envelope::kind).collect()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedTransport {
    script: VecDeque<Step>,
    exhausted: Exhausted,
    recorder: Recorder,
    closed: bool,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>, exhausted: Exhausted) -> Self {
        Self {
            script: steps.into_iter().collect(),
            exhausted,
            recorder: Recorder::default(),
            closed: false,
        }
    }

    pub(crate) fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.recorder.sent.lock().unwrap().push(envelope.clone());
        Ok(())
    }

    async fn receive(&mut self, deadline: Option<Duration>) -> Result<Envelope, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        match self.script.pop_front() {
            Some(Step::Frame(envelope)) => Ok(envelope),
            Some(Step::Raw(text)) => Decoder::decode(text).map_err(SessionError::Decode),
            Some(Step::Drop) => Err(SessionError::Transport(
                "connection reset by peer".to_string(),
            )),
            None => match self.exhausted {
                Exhausted::Closed => Err(SessionError::Closed),
                Exhausted::Silent => match deadline {
                    Some(deadline) => {
                        tokio::time::sleep(deadline).await;
                        Err(SessionError::Timeout)
                    }
                    None => std::future::pending().await,
                },
            },
        }
    }

    async fn close(&mut self, _reason: &str) {
        self.closed = true;
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) type ServerStream = WebSocketStream<TcpStream>;

pub(crate) struct ServerOptions {
    /// Echo the offered subprotocol back to the client.
    pub(crate) negotiate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { negotiate: true }
    }
}

pub(crate) struct TestServer {
    pub(crate) url: String,
    user_agent: Arc<Mutex<Option<String>>>,
}

impl TestServer {
    pub(crate) fn user_agent(&self) -> Option<String> {
        self.user_agent.lock().unwrap().clone()
    }
}

/// Accepts one WebSocket connection on a loopback port and hands it to `handler`.
pub(crate) async fn spawn_ws_server<F, Fut>(options: ServerOptions, handler: F) -> TestServer
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let user_agent = Arc::new(Mutex::new(None));
    let seen = user_agent.clone();
    let negotiate = options.negotiate;

    tokio::spawn(async move {
        let Ok((tcp, _)) = listener.accept().await else {
            return;
        };
        let callback = move |request: &Request, mut response: Response| {
            *seen.lock().unwrap() = request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            if negotiate {
                if let Some(offered) = request.headers().get(header::SEC_WEBSOCKET_PROTOCOL) {
                    response
                        .headers_mut()
                        .insert(header::SEC_WEBSOCKET_PROTOCOL, offered.clone());
                }
            }
            Ok::<Response, ErrorResponse>(response)
        };
        if let Ok(ws) = tokio_tungstenite::accept_hdr_async(tcp, callback).await {
            handler(ws).await;
        }
    });

    TestServer {
        url: format!("ws://{}", addr),
        user_agent,
    }
}

pub(crate) async fn read_envelope(ws: &mut ServerStream) -> Envelope {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Decoder::decode(text.as_str()).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }
}

pub(crate) async fn write_envelope(ws: &mut ServerStream, envelope: &Envelope) {
    let text = Encoder::encode(envelope).unwrap();
    ws.send(Message::text(text)).await.unwrap();
}

pub(crate) async fn write_text(ws: &mut ServerStream, text: &str) {
    ws.send(Message::text(text.to_owned())).await.unwrap();
}

/// Reads until the client goes away.
pub(crate) async fn drain(ws: &mut ServerStream) {
    while let Some(Ok(message)) = ws.next().await {
        if message.is_close() {
            break;
        }
    }
}
