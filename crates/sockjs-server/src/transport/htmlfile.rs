//! Hidden-iframe streaming: every frame arrives as a script tag calling
//! `p(frame)` in a page whose parent owns the callback.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;

use crate::app_state::Endpoint;
use super::http::FrameWriter;
use super::{headers, not_found, serve_receiver, valid_segments, CallbackQuery, HttpOpen};

const PRELUDE_MIN_LEN: usize = 1024;

/// Bootstrap page for `callback`, padded so browsers start rendering it.
pub fn htmlfile_prelude(callback: &str) -> String {
    let mut page = format!(
        r#"<!doctype html>
<html><head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
</head><body><h2>Don't panic!</h2>
  <script>
    document.domain = document.domain;
    var c = parent.{callback};
    c.start();
    function p(d) {{c.message(d);}};
    window.onload = function() {{c.stop();}};
  </script>
"#
    );
    if page.len() < PRELUDE_MIN_LEN {
        page.push_str(&" ".repeat(PRELUDE_MIN_LEN - page.len()));
    }
    page.push_str("\r\n");
    page
}

pub async fn htmlfile(
    State(ep): State<Arc<Endpoint>>,
    Path((server, session)): Path<(String, String)>,
    Query(q): Query<CallbackQuery>,
    req: HeaderMap,
) -> Response {
    if !valid_segments(&server, &session) || !ep.options().transport_enabled("htmlfile") {
        return not_found();
    }
    let callback = match q.callback() {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let open = HttpOpen {
        transport: "htmlfile",
        writer: FrameWriter::HtmlFile,
        content_type: headers::HTML,
        prelude: Some(Bytes::from(htmlfile_prelude(&callback))),
        limit: ep.options().response_limit,
    };
    serve_receiver(&ep, &session, &req, open).await
}
