//! Inbound message buffer.
//!
//! Unbounded FIFO between transports delivering client payloads and the
//! application handler's blocking receive. Many producers, one consumer.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use sockjs_core::{Result, SockJsError};

#[derive(Debug, Default)]
struct BufferState {
    queue: VecDeque<String>,
    closed: bool,
}

/// Cancellable, concurrency-safe FIFO of inbound messages.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    state: Mutex<BufferState>,
    notify: Notify,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append messages in order. Never blocks.
    ///
    /// Returns `SessionNotOpen` (and drops the messages) once the buffer is
    /// closed.
    pub fn push<I>(&self, messages: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if st.closed {
                return Err(SockJsError::SessionNotOpen);
            }
            st.queue.extend(messages);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Wait for the next message.
    ///
    /// Resolves with the oldest message, `SessionNotOpen` once the buffer is
    /// closed (undelivered messages are discarded on close), or `Cancelled`
    /// when `cancel` fires first, in which case nothing is consumed.
    pub async fn pop(&self, cancel: &CancellationToken) -> Result<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register interest before looking at the queue so a push landing
            // in between still wakes us
            notified.as_mut().enable();

            {
                let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                if st.closed {
                    return Err(SockJsError::SessionNotOpen);
                }
                if let Some(msg) = st.queue.pop_front() {
                    return Ok(msg);
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(SockJsError::Cancelled),
            }
        }
    }

    /// Close the buffer. Idempotent. Wakes every pending `pop`.
    pub fn close(&self) {
        {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if st.closed {
                return;
            }
            st.closed = true;
            st.queue.clear();
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Messages waiting to be popped.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
