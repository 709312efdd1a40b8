//! JSONP polling and its send endpoint.

use std::sync::Arc;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Form;
use bytes::Bytes;
use serde::Deserialize;

use sockjs_core::protocol::inbound::PAYLOAD_EXPECTED;

use crate::app_state::Endpoint;
use super::http::FrameWriter;
use super::{
    deliver, headers, not_found, preflight, serve_receiver, server_error, valid_segments,
    CallbackQuery, HttpOpen,
};

pub async fn jsonp(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    Query(q): Query<CallbackQuery>,
    req: HeaderMap,
) -> Response {
    if !valid_segments(&server, &session) || !ep.options().transport_enabled("jsonp") {
        return not_found();
    }
    let callback = match q.callback() {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let open = HttpOpen {
        transport: "jsonp",
        writer: FrameWriter::Jsonp { callback },
        content_type: headers::JAVASCRIPT,
        prelude: None,
        limit: 1,
    };
    serve_receiver(&ep, &session, &req, open).await
}

pub async fn jsonp_options(State(ep): State<Arc<Endpoint>>, req: HeaderMap) -> Response {
    preflight(&ep, &req, "OPTIONS, GET")
}

#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    d: Option<String>,
}

/// Form posts carry the payload in `d`; anything else is the raw body.
async fn send_payload(req: Request) -> Option<Bytes> {
    let is_form = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<SendForm>::from_request(req, &()).await.ok()?;
        form.d.map(Bytes::from)
    } else {
        Bytes::from_request(req, &()).await.ok()
    }
}

pub async fn jsonp_send(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    req: Request,
) -> Response {
    if !valid_segments(&server, &session) {
        return not_found();
    }
    let req_headers = req.headers().clone();
    let Some(payload) = send_payload(req).await else {
        return server_error(PAYLOAD_EXPECTED);
    };
    if let Err(resp) = deliver(&ep, &session, &payload) {
        return resp;
    }

    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::PLAIN);
    headers::no_cache(&mut out);
    headers::cors(&req_headers, &mut out);
    if ep.options().cookie_needed {
        headers::session_cookie(&req_headers, &mut out);
    }
    (StatusCode::OK, out, "ok").into_response()
}
