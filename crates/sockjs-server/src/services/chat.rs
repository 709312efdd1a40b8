use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::dispatch::SessionHandler;
use crate::session::Session;

const CHAT_BACKLOG: usize = 256;

/// Relays each inbound message to every chat session, sender included.
pub struct ChatService {
    tx: broadcast::Sender<String>,
}

impl Default for ChatService {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatService {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHAT_BACKLOG);
        Self { tx }
    }
}

#[async_trait]
impl SessionHandler for ChatService {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn handle(&self, session: Session) {
        let mut rx = self.tx.subscribe();
        loop {
            tokio::select! {
                inbound = session.recv() => match inbound {
                    Ok(msg) => {
                        // no subscribers is not an error for a chat room
                        let _ = self.tx.send(msg);
                    }
                    Err(_) => break,
                },
                outbound = rx.recv() => match outbound {
                    Ok(msg) => {
                        if session.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(session = %session.id(), skipped, "chat subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }
}
