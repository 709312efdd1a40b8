//! XHR transports: polling, streaming, and the send endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::app_state::Endpoint;
use super::http::FrameWriter;
use super::{deliver, headers, not_found, preflight, serve_receiver, valid_segments, HttpOpen};

/// Streaming clients need 2 KiB before they start processing the response.
fn streaming_prelude() -> Bytes {
    let mut prelude = "h".repeat(2048);
    prelude.push('\n');
    Bytes::from(prelude)
}

pub async fn xhr_polling(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    req: HeaderMap,
) -> Response {
    if !valid_segments(&server, &session) || !ep.options().transport_enabled("xhr") {
        return not_found();
    }
    let open = HttpOpen {
        transport: "xhr",
        writer: FrameWriter::Xhr,
        content_type: headers::JAVASCRIPT,
        prelude: None,
        limit: 1,
    };
    serve_receiver(&ep, &session, &req, open).await
}

pub async fn xhr_streaming(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    req: HeaderMap,
) -> Response {
    if !valid_segments(&server, &session) || !ep.options().transport_enabled("xhr_streaming") {
        return not_found();
    }
    let open = HttpOpen {
        transport: "xhr_streaming",
        writer: FrameWriter::Xhr,
        content_type: headers::JAVASCRIPT,
        prelude: Some(streaming_prelude()),
        limit: ep.options().response_limit,
    };
    serve_receiver(&ep, &session, &req, open).await
}

pub async fn xhr_send(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    req: HeaderMap,
    body: Bytes,
) -> Response {
    if !valid_segments(&server, &session) {
        return not_found();
    }
    if let Err(resp) = deliver(&ep, &session, &body) {
        return resp;
    }

    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::PLAIN);
    headers::no_cache(&mut out);
    headers::cors(&req, &mut out);
    if ep.options().cookie_needed {
        headers::session_cookie(&req, &mut out);
    }
    (StatusCode::NO_CONTENT, out).into_response()
}

pub async fn xhr_options(State(ep): State<Arc<Endpoint>>, req: HeaderMap) -> Response {
    preflight(&ep, &req, "OPTIONS, POST")
}
