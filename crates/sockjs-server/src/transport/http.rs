//! HTTP receiver: one response body carrying session frames.
//!
//! Polling transports end the response after the first frame; streaming ones
//! keep it open until `response_limit` bytes went out. Frames are pushed into
//! a bounded channel that backs the response body, so a client that stops
//! reading makes writes time out instead of piling up.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sockjs_core::protocol::frame::quote_for_script;
use sockjs_core::{Result, SockJsError};

use crate::session::{Receiver, ReceiverSignals};

const BODY_CHANNEL_CAPACITY: usize = 16;

/// How a rendered frame is wrapped on the wire.
#[derive(Debug, Clone)]
pub enum FrameWriter {
    /// `frame\n`
    Xhr,
    /// `data: frame\r\n\r\n`
    EventSource,
    /// Script tag calling `p("frame")`.
    HtmlFile,
    /// `callback("frame");`
    Jsonp { callback: String },
}

impl FrameWriter {
    pub fn render(&self, frame: &str) -> String {
        match self {
            FrameWriter::Xhr => format!("{frame}\n"),
            FrameWriter::EventSource => format!("data: {frame}\r\n\r\n"),
            FrameWriter::HtmlFile => format!("<script>\np({});\n</script>\r\n", quote_for_script(frame)),
            FrameWriter::Jsonp { callback } => format!("{callback}({});\r\n", quote_for_script(frame)),
        }
    }
}

struct HttpState {
    tx: Option<mpsc::Sender<Bytes>>,
    sent: usize,
}

pub struct HttpReceiver {
    transport: &'static str,
    writer: FrameWriter,
    limit: usize,
    write_timeout: Duration,
    state: Mutex<HttpState>,
    signals: ReceiverSignals,
}

impl HttpReceiver {
    /// Build a receiver and the response body it feeds. `prelude` goes out
    /// first and does not count against `limit`.
    pub fn new(
        transport: &'static str,
        writer: FrameWriter,
        limit: usize,
        write_timeout: Duration,
        prelude: Option<Bytes>,
    ) -> (Arc<Self>, ResponseBody) {
        let (tx, rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        let signals = ReceiverSignals::new();
        let receiver = Arc::new(Self {
            transport,
            writer,
            limit,
            write_timeout,
            state: Mutex::new(HttpState { tx: Some(tx), sent: 0 }),
            signals: signals.clone(),
        });
        let body = ResponseBody {
            prelude,
            rx,
            signals,
        };
        (receiver, body)
    }

    pub fn bytes_sent(&self) -> usize {
        self.lock().sent
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HttpState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signal completion before the channel closes, so the body ending is
    /// never mistaken for the client going away.
    fn finish(&self) {
        self.signals.finish();
        self.lock().tx = None;
    }
}

#[async_trait]
impl Receiver for HttpReceiver {
    fn transport(&self) -> &'static str {
        self.transport
    }

    async fn send_frame(&self, frame: &str) -> Result<()> {
        let Some(tx) = self.lock().tx.clone() else {
            return Ok(());
        };

        let chunk = Bytes::from(self.writer.render(frame));
        let n = chunk.len();
        match tokio::time::timeout(self.write_timeout, tx.send(chunk)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                self.signals.interrupt();
                return Err(SockJsError::Interrupted);
            }
            Err(_) => {
                self.signals.interrupt();
                self.lock().tx = None;
                return Err(SockJsError::WriteTimeout);
            }
        }

        let reached = {
            let mut st = self.lock();
            st.sent += n;
            st.sent >= self.limit
        };
        if reached {
            self.finish();
        }
        Ok(())
    }

    fn close(&self) {
        self.finish();
    }

    fn can_send(&self) -> bool {
        self.lock().tx.is_some()
    }

    fn done_notify(&self) -> CancellationToken {
        self.signals.done()
    }

    fn interrupted_notify(&self) -> CancellationToken {
        self.signals.interrupted()
    }
}

/// Response body fed by an [`HttpReceiver`].
///
/// Dropping it before the receiver finished (the client went away) marks the
/// receiver interrupted.
pub struct ResponseBody {
    prelude: Option<Bytes>,
    rx: mpsc::Receiver<Bytes>,
    signals: ReceiverSignals,
}

impl Stream for ResponseBody {
    type Item = std::result::Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(prelude) = self.prelude.take() {
            return Poll::Ready(Some(Ok(prelude)));
        }
        self.rx.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.signals.interrupt();
    }
}
