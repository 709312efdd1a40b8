//! Top-level facade crate for the SockJS server.
//!
//! Re-exports the protocol core and the server library so users can depend on
//! a single crate.

pub mod core {
    pub use sockjs_core::*;
}

pub mod server {
    pub use sockjs_server::*;
}

pub use sockjs_core::{Result, SockJsError};
pub use sockjs_server::dispatch::SessionHandler;
pub use sockjs_server::session::{Session, SessionState};
