//! Static-ish endpoint pages: greeting, info, and the iframe bootstrap.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::app_state::Endpoint;
use super::{headers, not_found, preflight};

pub const WELCOME: &str = "Welcome to SockJS!\n";

pub async fn welcome() -> Response {
    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::PLAIN);
    (StatusCode::OK, out, WELCOME).into_response()
}

#[derive(Debug, Serialize)]
struct Info {
    websocket: bool,
    cookie_needed: bool,
    origins: [&'static str; 1],
    entropy: u32,
}

pub async fn info(State(ep): State<Arc<Endpoint>>, req: HeaderMap) -> Response {
    let info = Info {
        websocket: ep.options().websocket,
        cookie_needed: ep.options().cookie_needed,
        origins: ["*:*"],
        entropy: rand::random::<u32>() >> 1,
    };
    let body = match serde_json::to_string(&info) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "info encode failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::JSON);
    headers::no_cache(&mut out);
    headers::cors(&req, &mut out);
    (StatusCode::OK, out, body).into_response()
}

pub async fn info_options(State(ep): State<Arc<Endpoint>>, req: HeaderMap) -> Response {
    preflight(&ep, &req, "OPTIONS, GET")
}

/// The iframe bootstrap page for one endpoint, rendered once.
#[derive(Debug, Clone)]
pub struct IframePage {
    body: String,
    etag: String,
}

impl IframePage {
    pub fn new(sockjs_url: &str) -> Self {
        let body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta http-equiv="X-UA-Compatible" content="IE=edge" />
  <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
  <script>
    document.domain = document.domain;
    _sockjs_onload = function(){{SockJS.bootstrap_iframe();}};
  </script>
  <script src="{sockjs_url}"></script>
</head>
<body>
  <h2>Don't panic!</h2>
  <p>This is a SockJS hidden iframe. It's used for cross domain magic.</p>
</body>
</html>"#
        );
        let etag = format!("\"{}\"", hex::encode(Sha256::digest(body.as_bytes())));
        Self { body, etag }
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

fn is_iframe_name(file: &str) -> bool {
    file.starts_with("iframe") && file.ends_with(".html")
}

/// `/iframe.html`, `/iframe-<version>.html` and friends.
pub async fn iframe(
    State(ep): State<Arc<Endpoint>>,
    Path(file): Path<String>,
    req: HeaderMap,
) -> Response {
    if !is_iframe_name(&file) {
        return not_found();
    }
    let page = ep.iframe();
    if req
        .get(IF_NONE_MATCH)
        .is_some_and(|v| v.as_bytes() == page.etag().as_bytes())
    {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let mut out = HeaderMap::new();
    headers::content_type(&mut out, headers::HTML);
    out.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=31536000"));
    if let Ok(etag) = HeaderValue::from_str(page.etag()) {
        out.insert(ETAG, etag);
    }
    (StatusCode::OK, out, page.body().to_string()).into_response()
}
