//! Session engine.
//!
//! Transport-independent: a [`Session`] buffers traffic in both directions and
//! talks to whatever transport connection is currently attached through the
//! [`Receiver`] capability.

pub mod buffer;
pub mod receiver;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod session;

pub use buffer::MessageBuffer;
pub use receiver::{Receiver, ReceiverSignals};
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig, SessionState};
