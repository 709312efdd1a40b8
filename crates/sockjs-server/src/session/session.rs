//! Session state machine.
//!
//! A session owns the outbound send buffer, the inbound [`MessageBuffer`], at
//! most one attached [`Receiver`], and a single-slot timer. The timer is the
//! disconnect timeout while no receiver is attached and the heartbeat interval
//! while one is; the two are never armed together.
//!
//! State only moves forward: `Opening -> Active -> Closing -> Closed`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sockjs_core::protocol::frame::{
    close_frame, CLOSE_GO_AWAY, CLOSE_GO_AWAY_REASON, HEARTBEAT_FRAME, OPEN_FRAME,
};
use sockjs_core::{Result, SockJsError};

use super::buffer::MessageBuffer;
use super::receiver::Receiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// No frame sent yet; the first receiver gets the open frame.
    Opening,
    Active,
    /// `Close` was called; late receivers get the stored close frame.
    Closing,
    /// Terminal. Timers stopped, close notification fired.
    Closed,
}

/// Timing and framing knobs a session consumes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Heartbeat period while a receiver is attached. Zero disables heartbeats.
    pub heartbeat_delay: Duration,
    /// How long a session may stay without a receiver before it is closed.
    pub disconnect_delay: Duration,
    /// Raw mode: no open frame; receivers carry payloads without an envelope.
    pub raw: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_delay: Duration::from_secs(25),
            disconnect_delay: Duration::from_secs(5),
            raw: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Heartbeat,
    Disconnect,
}

struct SessionTimer {
    seq: u64,
    handle: JoinHandle<()>,
}

struct Attached {
    seq: u64,
    receiver: Arc<dyn Receiver>,
}

struct Shared {
    state: SessionState,
    recv: Option<Attached>,
    send_buffer: Vec<String>,
    close_frame: String,
    attach_seq: u64,
}

struct SessionInner {
    id: String,
    config: SessionConfig,
    shared: Mutex<Shared>,
    // single slot; only touched briefly, never across an await
    timer: StdMutex<Option<SessionTimer>>,
    timer_seq: AtomicU64,
    recv_buffer: MessageBuffer,
    closed: CancellationToken,
}

/// Handle to one logical client session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.inner.id).finish()
    }
}

impl Session {
    /// Create a session and arm its disconnect timer. Must be called inside a
    /// tokio runtime.
    pub fn new(id: impl Into<String>, config: SessionConfig) -> Self {
        let session = Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                config,
                shared: Mutex::new(Shared {
                    state: SessionState::Opening,
                    recv: None,
                    send_buffer: Vec::new(),
                    close_frame: close_frame(CLOSE_GO_AWAY, CLOSE_GO_AWAY_REASON),
                    attach_seq: 0,
                }),
                timer: StdMutex::new(None),
                timer_seq: AtomicU64::new(0),
                recv_buffer: MessageBuffer::new(),
                closed: CancellationToken::new(),
            }),
        };
        session.arm(TimerKind::Disconnect);
        session
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub async fn state(&self) -> SessionState {
        self.inner.shared.lock().await.state
    }

    /// Cancelled exactly once, when the session reaches `Closed`.
    pub fn closed_notify(&self) -> CancellationToken {
        self.inner.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// True when both handles refer to the same session instance.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Queue a message for the client.
    ///
    /// The whole pending buffer is flushed as one data frame when a receiver
    /// that can send is attached; otherwise it waits for the next attach.
    /// Transport failures surface as `SessionNotOpen`.
    pub async fn send(&self, message: impl Into<String>) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        if shared.state > SessionState::Active {
            return Err(SockJsError::SessionNotOpen);
        }
        shared.send_buffer.push(message.into());

        let receiver = match shared.recv.as_ref() {
            Some(att) if att.receiver.can_send() => Arc::clone(&att.receiver),
            _ => return Ok(()),
        };
        // a failed write interrupts the receiver and the watcher ends the session
        if let Err(e) = receiver.send_bulk(&shared.send_buffer).await {
            tracing::debug!(session = %self.inner.id, error = %e, "send failed");
            return Err(SockJsError::SessionNotOpen);
        }
        shared.send_buffer.clear();
        Ok(())
    }

    /// Wait for the next inbound message.
    pub async fn recv(&self) -> Result<String> {
        self.inner.recv_buffer.pop(&CancellationToken::new()).await
    }

    /// Like [`Session::recv`], giving up with `Cancelled` when `cancel` fires.
    pub async fn recv_with_cancel(&self, cancel: &CancellationToken) -> Result<String> {
        self.inner.recv_buffer.pop(cancel).await
    }

    /// Start closing the session with the given close frame.
    ///
    /// Only the first call has an effect; later calls return `SessionNotOpen`.
    pub async fn close(&self, code: u32, reason: &str) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        if shared.state >= SessionState::Closing {
            return Err(SockJsError::SessionNotOpen);
        }
        shared.close_frame = close_frame(code, reason);
        self.begin_closing(&mut shared).await;
        Ok(())
    }

    /// Deliver inbound client messages. Fails with `SessionNotOpen` (dropping
    /// the messages) once the session is closing.
    pub fn accept<I>(&self, messages: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        self.inner.recv_buffer.push(messages)
    }

    /// Attach the receiver of a new transport connection. Used by transports.
    ///
    /// Fails with `ReceiverAlreadyAttached` without touching the session when
    /// another receiver is attached; the caller answers the rejected
    /// connection itself. While closing, the stored close frame is sent and
    /// the receiver closed, leaving the session as it was.
    pub async fn attach_receiver(&self, receiver: Arc<dyn Receiver>) -> Result<()> {
        let mut shared = self.inner.shared.lock().await;
        if let Some(att) = shared.recv.as_ref() {
            // the watcher may not have run yet for a receiver that already ended
            let interrupted = att.receiver.interrupted_notify().is_cancelled();
            let done = att.receiver.done_notify().is_cancelled();
            if !interrupted && !done {
                return Err(SockJsError::ReceiverAlreadyAttached);
            }
            if interrupted {
                shared.recv = None;
                self.terminate_locked(&mut shared).await;
            } else {
                self.detach_locked(&mut shared);
            }
        }

        if shared.state >= SessionState::Closing {
            let sent = receiver.send_frame(&shared.close_frame).await;
            receiver.close();
            return sent;
        }

        shared.attach_seq += 1;
        let seq = shared.attach_seq;
        shared.recv = Some(Attached {
            seq,
            receiver: Arc::clone(&receiver),
        });
        self.watch_receiver(seq, &receiver);
        self.arm(TimerKind::Heartbeat);

        tracing::debug!(session = %self.inner.id, transport = receiver.transport(), "receiver attached");

        if shared.state == SessionState::Opening {
            if !self.inner.config.raw {
                receiver.send_frame(OPEN_FRAME).await?;
            }
            shared.state = SessionState::Active;
        }

        // a one-shot receiver may already be spent on the open frame
        if !shared.send_buffer.is_empty() && receiver.can_send() {
            receiver.send_bulk(&shared.send_buffer).await?;
            shared.send_buffer.clear();
        }
        Ok(())
    }

    /// Drop the attached receiver (if any) and arm the disconnect timer.
    pub async fn detach_receiver(&self) {
        let mut shared = self.inner.shared.lock().await;
        self.detach_locked(&mut shared);
    }

    /// Tear the session down: closing, then `Closed`. Idempotent.
    pub async fn terminate(&self) {
        let mut shared = self.inner.shared.lock().await;
        self.terminate_locked(&mut shared).await;
    }

    fn detach_locked(&self, shared: &mut Shared) {
        if shared.recv.take().is_some() {
            tracing::debug!(session = %self.inner.id, "receiver detached");
        }
        if shared.state < SessionState::Closed {
            self.arm(TimerKind::Disconnect);
        }
    }

    async fn detach_if(&self, seq: u64) {
        let mut shared = self.inner.shared.lock().await;
        if shared.recv.as_ref().is_some_and(|att| att.seq == seq) {
            self.detach_locked(&mut shared);
        }
    }

    async fn on_interrupted(&self, seq: u64) {
        let mut shared = self.inner.shared.lock().await;
        if shared.recv.as_ref().is_some_and(|att| att.seq == seq) {
            shared.recv = None;
            tracing::debug!(session = %self.inner.id, "receiver interrupted");
            self.terminate_locked(&mut shared).await;
        }
    }

    async fn begin_closing(&self, shared: &mut Shared) {
        if shared.state >= SessionState::Closing {
            return;
        }
        shared.state = SessionState::Closing;
        self.inner.recv_buffer.close();
        if let Some(att) = shared.recv.as_ref() {
            let receiver = Arc::clone(&att.receiver);
            if let Err(e) = receiver.send_frame(&shared.close_frame).await {
                tracing::debug!(session = %self.inner.id, error = %e, "close frame not delivered");
            }
            receiver.close();
        }
    }

    async fn terminate_locked(&self, shared: &mut Shared) {
        self.begin_closing(shared).await;
        if shared.state < SessionState::Closed {
            shared.state = SessionState::Closed;
            self.stop_timer();
            self.inner.closed.cancel();
            tracing::info!(session = %self.inner.id, "session closed");
        }
    }

    fn watch_receiver(&self, seq: u64, receiver: &Arc<dyn Receiver>) {
        let done = receiver.done_notify();
        let interrupted = receiver.interrupted_notify();
        let session = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = done.cancelled() => session.detach_if(seq).await,
                _ = interrupted.cancelled() => session.on_interrupted(seq).await,
            }
        });
    }

    // ---- single-slot timer

    fn arm(&self, kind: TimerKind) {
        let delay = match kind {
            TimerKind::Heartbeat => self.inner.config.heartbeat_delay,
            TimerKind::Disconnect => self.inner.config.disconnect_delay,
        };

        let mut slot = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.take() {
            old.handle.abort();
        }
        if kind == TimerKind::Heartbeat && delay.is_zero() {
            return;
        }

        let seq = self.inner.timer_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Session { inner }.on_timer(seq, kind).await;
            }
        });
        *slot = Some(SessionTimer { seq, handle });
    }

    fn stop_timer(&self) {
        let mut slot = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = slot.take() {
            old.handle.abort();
        }
    }

    /// Take the slot if it still holds timer `seq`, so nobody can abort the
    /// task that is now running it.
    fn claim_timer(&self, seq: u64) -> bool {
        let mut slot = self.inner.timer.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(t) if t.seq == seq => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    async fn on_timer(&self, seq: u64, kind: TimerKind) {
        let mut shared = self.inner.shared.lock().await;
        if !self.claim_timer(seq) {
            return;
        }
        match kind {
            TimerKind::Heartbeat => {
                let Some(receiver) = shared.recv.as_ref().map(|att| Arc::clone(&att.receiver)) else {
                    return;
                };
                self.arm(TimerKind::Heartbeat);
                if let Err(e) = receiver.send_frame(HEARTBEAT_FRAME).await {
                    tracing::debug!(session = %self.inner.id, error = %e, "heartbeat not delivered");
                }
            }
            TimerKind::Disconnect => {
                if shared.recv.is_none() {
                    tracing::debug!(session = %self.inner.id, "disconnect delay elapsed");
                    self.terminate_locked(&mut shared).await;
                }
            }
        }
    }
}
