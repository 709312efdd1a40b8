use async_trait::async_trait;

use crate::dispatch::SessionHandler;
use crate::session::Session;

/// Sends every inbound message straight back.
#[derive(Default)]
pub struct EchoService;

impl EchoService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionHandler for EchoService {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn handle(&self, session: Session) {
        while let Ok(msg) = session.recv().await {
            if session.send(msg).await.is_err() {
                break;
            }
        }
    }
}
