//! Shared fixtures for the session tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sockjs_core::Result;
use sockjs_server::session::{Receiver, ReceiverSignals};

/// In-memory receiver recording every frame it was given.
pub struct MockReceiver {
    frames: Mutex<Vec<String>>,
    open: AtomicBool,
    one_shot: bool,
    signals: ReceiverSignals,
}

impl MockReceiver {
    fn build(one_shot: bool) -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            one_shot,
            signals: ReceiverSignals::new(),
        })
    }

    /// Keeps accepting frames until closed.
    pub fn streaming() -> Arc<Self> {
        Self::build(false)
    }

    /// Closes itself after the first frame.
    pub fn polling() -> Arc<Self> {
        Self::build(true)
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Simulate the client connection dying.
    pub fn interrupt(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.signals.interrupt();
    }
}

#[async_trait]
impl Receiver for MockReceiver {
    fn transport(&self) -> &'static str {
        "mock"
    }

    async fn send_frame(&self, frame: &str) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        self.frames.lock().unwrap().push(frame.to_string());
        if self.one_shot {
            self.close();
        }
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.signals.finish();
    }

    fn can_send(&self) -> bool {
        self.is_open()
    }

    fn done_notify(&self) -> CancellationToken {
        self.signals.done()
    }

    fn interrupted_notify(&self) -> CancellationToken {
        self.signals.interrupted()
    }
}

/// Let spawned watcher tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
