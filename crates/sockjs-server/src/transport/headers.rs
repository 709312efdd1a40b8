//! Response header helpers shared by every HTTP route.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    CACHE_CONTROL, CONTENT_TYPE, COOKIE, ORIGIN, SET_COOKIE,
};
use axum::http::{HeaderMap, HeaderValue};

pub const JAVASCRIPT: &str = "application/javascript; charset=UTF-8";
pub const EVENT_STREAM: &str = "text/event-stream; charset=UTF-8";
pub const HTML: &str = "text/html; charset=UTF-8";
pub const JSON: &str = "application/json; charset=UTF-8";
pub const PLAIN: &str = "text/plain; charset=UTF-8";

const SESSION_COOKIE: &str = "JSESSIONID";

/// Echo the request origin (or `*`) and any requested headers.
pub fn cors(req: &HeaderMap, out: &mut HeaderMap) {
    let origin = req
        .get(ORIGIN)
        .filter(|v| !v.is_empty() && v.as_bytes() != b"null")
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    out.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    out.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    if let Some(requested) = req
        .get(ACCESS_CONTROL_REQUEST_HEADERS)
        .filter(|v| !v.is_empty() && v.as_bytes() != b"null")
    {
        out.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }
}

pub fn content_type(out: &mut HeaderMap, value: &'static str) {
    out.insert(CONTENT_TYPE, HeaderValue::from_static(value));
}

pub fn no_cache(out: &mut HeaderMap) {
    out.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, no-transform, must-revalidate, max-age=0"),
    );
}

/// Preflight responses are cacheable for a year.
pub fn cache_for_a_year(out: &mut HeaderMap, methods: &'static str) {
    out.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(methods));
    out.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=31536000"));
    out.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("31536000"));
}

/// Sticky-session cookie: echo the client's `JSESSIONID` or hand out a dummy.
pub fn session_cookie(req: &HeaderMap, out: &mut HeaderMap) {
    let value = req
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| "dummy".to_string());

    if let Ok(v) = HeaderValue::from_str(&format!("{SESSION_COOKIE}={value}; Path=/")) {
        out.insert(SET_COOKIE, v);
    }
}
