//! Websocket transports.
//!
//! Each upgraded socket gets its own standalone session: the receiver is
//! attached for the whole socket lifetime and the session ends with it.
//!
//! - `/{server}/{session}/websocket`: frames exactly as the HTTP transports
//!   (`o`, `h`, `a[...]`, `c[...]`), inbound text is a JSON array of strings
//!   or a single JSON string.
//! - `/websocket` (raw): no framing. Each message is one text frame, heartbeats
//!   become pings, the close frame becomes a websocket close.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sockjs_core::protocol::frame::{frame_kind, parse_close_frame, FrameKind};
use sockjs_core::protocol::inbound::decode_ws_frame;
use sockjs_core::{Result, SockJsError};

use crate::app_state::Endpoint;
use crate::session::{Receiver, ReceiverSignals};
use super::{not_found, valid_segments};

const OUTBOUND_CAPACITY: usize = 256;

pub struct WsReceiver {
    raw: bool,
    tx: Mutex<Option<mpsc::Sender<Message>>>,
    write_timeout: Duration,
    signals: ReceiverSignals,
}

impl WsReceiver {
    pub fn new(tx: mpsc::Sender<Message>, raw: bool, write_timeout: Duration) -> Self {
        Self {
            raw,
            tx: Mutex::new(Some(tx)),
            write_timeout,
            signals: ReceiverSignals::new(),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Message>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn drop_sender(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// The socket went away underneath the session.
    pub fn abort(&self) {
        self.signals.interrupt();
        self.drop_sender();
    }

    async fn push(&self, msg: Message) -> Result<()> {
        let Some(tx) = self.sender() else {
            return Ok(());
        };
        match tokio::time::timeout(self.write_timeout, tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                self.abort();
                Err(SockJsError::Interrupted)
            }
            Err(_) => {
                self.abort();
                Err(SockJsError::WriteTimeout)
            }
        }
    }

    fn raw_message(frame: &str) -> Option<Message> {
        match frame_kind(frame) {
            Some(FrameKind::Open) => None,
            Some(FrameKind::Heartbeat) => Some(Message::Ping(Vec::new())),
            Some(FrameKind::Close) => {
                let (code, reason) = parse_close_frame(frame)?;
                Some(Message::Close(Some(CloseFrame {
                    code: u16::try_from(code).unwrap_or(1000),
                    reason: Cow::Owned(reason),
                })))
            }
            Some(FrameKind::Data) | None => Some(Message::Text(frame.to_string())),
        }
    }
}

#[async_trait]
impl Receiver for WsReceiver {
    fn transport(&self) -> &'static str {
        if self.raw {
            "raw_websocket"
        } else {
            "websocket"
        }
    }

    async fn send_bulk(&self, messages: &[String]) -> Result<()> {
        if !self.raw {
            if messages.is_empty() {
                return Ok(());
            }
            let frame = sockjs_core::protocol::frame::data_frame(messages);
            return self.push(Message::Text(frame)).await;
        }
        for m in messages {
            self.push(Message::Text(m.clone())).await?;
        }
        Ok(())
    }

    async fn send_frame(&self, frame: &str) -> Result<()> {
        if !self.raw {
            return self.push(Message::Text(frame.to_string())).await;
        }
        match Self::raw_message(frame) {
            Some(msg) => self.push(msg).await,
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.signals.finish();
        self.drop_sender();
    }

    fn can_send(&self) -> bool {
        self.sender().is_some()
    }

    fn done_notify(&self) -> CancellationToken {
        self.signals.done()
    }

    fn interrupted_notify(&self) -> CancellationToken {
        self.signals.interrupted()
    }
}

pub async fn websocket(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> Response {
    if !ep.options().websocket || !valid_segments(&server, &session) {
        return not_found();
    }
    ws.on_upgrade(move |socket| run_socket(ep, socket, false))
}

pub async fn raw_websocket(State(ep): State<Arc<Endpoint>>, ws: WebSocketUpgrade) -> Response {
    if !ep.options().raw_websocket {
        return not_found();
    }
    ws.on_upgrade(move |socket| run_socket(ep, socket, true))
}

/// Messages carried by one inbound text frame. Raw sockets take the text
/// as a single message.
pub fn decode_inbound(raw: bool, text: String) -> Result<Vec<String>> {
    if raw {
        Ok(vec![text])
    } else {
        decode_ws_frame(&text)
    }
}

/// Write one outbound message to the socket within `timeout`. Returns
/// `false` once the socket loop should stop: the write failed or timed out,
/// or the message was a close.
pub async fn forward<S>(sink: &mut S, msg: Message, timeout: Duration) -> bool
where
    S: Sink<Message> + Unpin,
{
    let closing = matches!(msg, Message::Close(_));
    match tokio::time::timeout(timeout, sink.send(msg)).await {
        Ok(Ok(())) => !closing,
        Ok(Err(_)) => false,
        Err(_) => {
            tracing::debug!(?timeout, "websocket write timed out");
            false
        }
    }
}

async fn run_socket(ep: Arc<Endpoint>, socket: WebSocket, raw: bool) {
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let write_timeout = ep.options().write_timeout();
    let receiver = Arc::new(WsReceiver::new(out_tx, raw, write_timeout));
    let session = ep.standalone_session(raw);
    let labels = [("endpoint", ep.prefix()), ("transport", receiver.transport())];

    if let Err(e) = session.attach_receiver(receiver.clone()).await {
        tracing::debug!(session = %session.id(), error = %e, "websocket attach failed");
        session.terminate().await;
        return;
    }
    ep.metrics().receivers_attached.inc(&labels);

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if !forward(&mut ws_tx, m, write_timeout).await {
                            break;
                        }
                    }
                    None => {
                        forward(&mut ws_tx, Message::Close(None), write_timeout).await;
                        break;
                    }
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                match msg {
                    Message::Text(text) => match decode_inbound(raw, text) {
                        Ok(messages) => {
                            let n = messages.len() as u64;
                            if session.accept(messages).is_ok() {
                                ep.metrics().messages_received.add(&[("endpoint", ep.prefix())], n);
                            }
                        }
                        Err(e) => {
                            ep.metrics().payload_errors.inc(&[("endpoint", ep.prefix())]);
                            tracing::debug!(session = %session.id(), error = %e, "malformed websocket frame");
                            break;
                        }
                    },
                    Message::Close(_) => break,
                    // pings are answered by the socket itself
                    _ => {}
                }
            }
        }
    }

    receiver.abort();
    session.terminate().await;
}
