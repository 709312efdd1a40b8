use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use sockjs_core::{Result, SockJsError};

use crate::session::Session;

/// Application logic bound to a session. `handle` runs on its own task for
/// the whole session lifetime; returning early does not close the session.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, session: Session);
}

/// Named registry of session handlers. Endpoints pick theirs by name.
#[derive(Default)]
pub struct Dispatcher {
    handlers: DashMap<&'static str, Arc<dyn SessionHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn SessionHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SessionHandler>> {
        self.handlers
            .get(name)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| SockJsError::InvalidConfig(format!("unknown service: {name}")))
    }

    /// Run `handler` for `session` on a fresh task.
    pub fn spawn(handler: Arc<dyn SessionHandler>, session: Session) {
        tokio::spawn(async move {
            let id = session.id().to_string();
            handler.handle(session).await;
            tracing::debug!(session = %id, service = handler.name(), "handler finished");
        });
    }
}
