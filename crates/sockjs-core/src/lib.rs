//! SockJS core: transport-agnostic protocol primitives and the shared error type.
//!
//! This crate defines the wire-level contract that every transport must honour
//! byte-for-byte (open/heartbeat/data/close frames and their escaping) plus the
//! decoding of inbound client payloads. It carries no runtime or HTTP
//! dependencies so the framing rules can be reused and tested in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `SockJsError`/`Result` so malformed client
//! payloads can never bring the server down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorClass, Result, SockJsError};
