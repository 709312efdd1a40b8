use async_trait::async_trait;

use sockjs_core::protocol::frame::{CLOSE_GO_AWAY, CLOSE_GO_AWAY_REASON};

use crate::dispatch::SessionHandler;
use crate::session::Session;

/// Closes every session as soon as it exists.
#[derive(Default)]
pub struct CloseService;

impl CloseService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionHandler for CloseService {
    fn name(&self) -> &'static str {
        "close"
    }

    async fn handle(&self, session: Session) {
        let _ = session.close(CLOSE_GO_AWAY, CLOSE_GO_AWAY_REASON).await;
    }
}
