//! Inbound client payloads.
//!
//! HTTP send endpoints carry a JSON array of strings. Websocket frames carry
//! either such an array or a single JSON string. Anything else is rejected
//! before it reaches a session.

use serde::Deserialize;

use crate::error::{Result, SockJsError};

pub const PAYLOAD_EXPECTED: &str = "Payload expected.";
pub const BROKEN_JSON: &str = "Broken JSON encoding.";

/// Decode an HTTP send body (`["m1","m2"]`).
pub fn decode_messages(payload: &[u8]) -> Result<Vec<String>> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(SockJsError::BadPayload(PAYLOAD_EXPECTED.into()));
    }
    serde_json::from_slice::<Vec<String>>(payload)
        .map_err(|_| SockJsError::BadPayload(BROKEN_JSON.into()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WsPayload {
    Many(Vec<String>),
    One(String),
}

/// Decode one websocket text frame. Empty frames carry no messages.
pub fn decode_ws_frame(text: &str) -> Result<Vec<String>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<WsPayload>(text) {
        Ok(WsPayload::Many(v)) => Ok(v),
        Ok(WsPayload::One(s)) => Ok(vec![s]),
        Err(_) => Err(SockJsError::BadPayload(BROKEN_JSON.into())),
    }
}
