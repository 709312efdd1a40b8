//! Protocol modules (frame codec + inbound payloads).
//!
//! - `frame`: renders the four outbound frame kinds (open, heartbeat, data,
//!   close) into the exact text every transport wraps.
//! - `inbound`: decodes client payloads (JSON arrays of strings) delivered by
//!   the send endpoints and websocket read loops.
//!
//! Both are panic-free: malformed input is reported as `SockJsError` instead
//! of panicking or indexing raw buffers.

pub mod frame;
pub mod inbound;
