//! Transport layer.
//!
//! Each transport turns an HTTP request (or an upgraded websocket) into a
//! [`Receiver`](crate::session::Receiver) attached to the addressed session,
//! or delivers inbound payloads to it.

pub mod eventsource;
pub mod headers;
pub mod htmlfile;
pub mod http;
pub mod jsonp;
pub mod pages;
pub mod ws;
pub mod xhr;

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;

use sockjs_core::protocol::frame::{
    close_frame, CLOSE_ANOTHER_CONNECTION, CLOSE_ANOTHER_CONNECTION_REASON,
};
use sockjs_core::SockJsError;

use crate::app_state::Endpoint;
use crate::session::Receiver;
use self::http::{FrameWriter, HttpReceiver};

/// Server and session path segments may not contain dots.
pub(crate) fn valid_segments(server: &str, session: &str) -> bool {
    !server.is_empty() && !session.is_empty() && !server.contains('.') && !session.contains('.')
}

pub(crate) fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

pub(crate) fn server_error(msg: &str) -> Response {
    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::PLAIN);
    (StatusCode::INTERNAL_SERVER_ERROR, out, format!("{msg}\n")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub c: Option<String>,
}

impl CallbackQuery {
    /// The `c` parameter, or the error response to send instead.
    pub(crate) fn callback(&self) -> std::result::Result<String, Response> {
        match self.c.as_deref() {
            None | Some("") => Err(server_error("\"callback\" parameter required")),
            Some(c) if c.chars().all(|ch| ch.is_ascii_alphanumeric() || "_.-".contains(ch)) => {
                Ok(c.to_string())
            }
            Some(_) => Err(server_error("invalid \"callback\" parameter")),
        }
    }
}

/// Message text carried by a payload error, without the error prefix.
pub(crate) fn payload_error_text(err: &SockJsError) -> String {
    match err {
        SockJsError::BadPayload(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// How one HTTP receiving transport frames its response.
pub(crate) struct HttpOpen {
    pub transport: &'static str,
    pub writer: FrameWriter,
    pub content_type: &'static str,
    pub prelude: Option<Bytes>,
    /// Bytes after which the response ends; 1 makes it a polling response.
    pub limit: usize,
}

/// Attach an HTTP receiver to the addressed session (creating the session if
/// needed) and stream its frames as the response body.
///
/// A request racing an already attached receiver gets the "another
/// connection still open" close frame and nothing else.
pub(crate) async fn serve_receiver(
    ep: &Endpoint,
    session_id: &str,
    req: &HeaderMap,
    open: HttpOpen,
) -> Response {
    let (receiver, body) = HttpReceiver::new(
        open.transport,
        open.writer,
        open.limit,
        ep.options().write_timeout(),
        open.prelude,
    );
    let session = ep.session_by_request(session_id);
    let labels = [("endpoint", ep.prefix()), ("transport", open.transport)];

    match session.attach_receiver(receiver.clone()).await {
        Ok(()) => ep.metrics().receivers_attached.inc(&labels),
        Err(SockJsError::ReceiverAlreadyAttached) => {
            ep.metrics().receivers_rejected.inc(&labels);
            tracing::debug!(session = %session_id, transport = open.transport, "another connection still open");
            let frame = close_frame(CLOSE_ANOTHER_CONNECTION, CLOSE_ANOTHER_CONNECTION_REASON);
            let _ = receiver.send_frame(&frame).await;
            receiver.close();
        }
        Err(e) => {
            tracing::debug!(session = %session_id, transport = open.transport, error = %e, "receiver failed while attaching");
        }
    }

    let mut out = HeaderMap::new();
    headers::content_type(&mut out, open.content_type);
    headers::no_cache(&mut out);
    headers::cors(req, &mut out);
    if ep.options().cookie_needed {
        headers::session_cookie(req, &mut out);
    }
    (StatusCode::OK, out, Body::from_stream(body)).into_response()
}

/// Decode a send payload and hand it to the session. `Ok` carries nothing;
/// `Err` is the response to send instead.
pub(crate) fn deliver(ep: &Endpoint, session_id: &str, payload: &[u8]) -> std::result::Result<(), Response> {
    let Some(session) = ep.lookup(session_id) else {
        return Err(not_found());
    };
    let messages = match sockjs_core::protocol::inbound::decode_messages(payload) {
        Ok(m) => m,
        Err(e) => {
            ep.metrics().payload_errors.inc(&[("endpoint", ep.prefix())]);
            return Err(server_error(&payload_error_text(&e)));
        }
    };
    let n = messages.len() as u64;
    // a closing session drops the messages; the sender is not told
    if session.accept(messages).is_ok() {
        ep.metrics().messages_received.add(&[("endpoint", ep.prefix())], n);
    }
    Ok(())
}

/// CORS preflight answer shared by the session routes.
pub(crate) fn preflight(ep: &Endpoint, req: &HeaderMap, methods: &'static str) -> Response {
    let mut out = HeaderMap::new();
    headers::cors(req, &mut out);
    headers::cache_for_a_year(&mut out, methods);
    if ep.options().cookie_needed {
        headers::session_cookie(req, &mut out);
    }
    (StatusCode::NO_CONTENT, out).into_response()
}
