//! SockJS server library entry.
//!
//! Wires the session engine, the transports, the dispatcher and the built-in
//! services into an axum application. Consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
pub mod session;
pub mod transport;
