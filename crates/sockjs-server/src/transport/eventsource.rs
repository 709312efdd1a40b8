use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;

use crate::app_state::Endpoint;
use super::http::FrameWriter;
use super::{headers, not_found, serve_receiver, valid_segments, HttpOpen};

/// Server-sent events. The leading CRLF works around old Opera.
pub async fn eventsource(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    req: HeaderMap,
) -> Response {
    if !valid_segments(&server, &session) || !ep.options().transport_enabled("eventsource") {
        return not_found();
    }
    let open = HttpOpen {
        transport: "eventsource",
        writer: FrameWriter::EventSource,
        content_type: headers::EVENT_STREAM,
        prelude: Some(Bytes::from_static(b"\r\n")),
        limit: ep.options().response_limit,
    };
    serve_receiver(&ep, &session, &req, open).await
}
