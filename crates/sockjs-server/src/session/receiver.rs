//! Receiver capability.
//!
//! A receiver is bound to one physical transport connection and pushes frames
//! to it. Sessions only ever talk to receivers through this trait; transports
//! differ in framing and in how many frames one connection may carry, never in
//! contract shape.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sockjs_core::protocol::frame;
use sockjs_core::Result;

#[async_trait]
pub trait Receiver: Send + Sync {
    /// Transport label used in logs and metrics.
    fn transport(&self) -> &'static str;

    /// Send messages as one data frame. No-op for an empty batch.
    async fn send_bulk(&self, messages: &[String]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        self.send_frame(&frame::data_frame(messages)).await
    }

    /// Send one rendered frame, wrapped the way this transport needs.
    ///
    /// Frames sent after the receiver is closed are dropped silently. A failed
    /// or timed-out write marks the receiver interrupted and returns the error.
    async fn send_frame(&self, frame: &str) -> Result<()>;

    /// Finish the receiver cleanly. Idempotent; `can_send` is false afterwards.
    fn close(&self);

    fn can_send(&self) -> bool;

    /// Cancelled when the receiver finished cleanly (closed, or its byte
    /// limit was reached).
    fn done_notify(&self) -> CancellationToken;

    /// Cancelled when the underlying connection died unexpectedly.
    fn interrupted_notify(&self) -> CancellationToken;
}

/// Completion signals shared by the receiver implementations.
#[derive(Debug, Clone, Default)]
pub struct ReceiverSignals {
    done: CancellationToken,
    interrupted: CancellationToken,
}

impl ReceiverSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal clean completion unless the receiver already ended.
    pub fn finish(&self) {
        if !self.interrupted.is_cancelled() {
            self.done.cancel();
        }
    }

    /// Signal interruption unless the receiver already ended.
    pub fn interrupt(&self) {
        if !self.done.is_cancelled() {
            self.interrupted.cancel();
        }
    }

    /// True once either signal fired.
    pub fn is_ended(&self) -> bool {
        self.done.is_cancelled() || self.interrupted.is_cancelled()
    }

    pub fn done(&self) -> CancellationToken {
        self.done.clone()
    }

    pub fn interrupted(&self) -> CancellationToken {
        self.interrupted.clone()
    }
}
