//! Shared application state.
//!
//! One [`Endpoint`] per configured prefix: its options, its session registry
//! and the handler every new session is bound to.

use std::sync::Arc;

use sockjs_core::Result;

use crate::config::{EndpointConfig, EndpointOptions, ServerConfig};
use crate::dispatch::{Dispatcher, SessionHandler};
use crate::obs::ServerMetrics;
use crate::services::{ChatService, CloseService, EchoService};
use crate::session::{Session, SessionRegistry};
use crate::transport::pages::IframePage;

pub struct Endpoint {
    prefix: String,
    options: EndpointOptions,
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn SessionHandler>,
    metrics: Arc<ServerMetrics>,
    iframe: IframePage,
}

impl Endpoint {
    pub fn new(cfg: &EndpointConfig, handler: Arc<dyn SessionHandler>, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            prefix: cfg.prefix.clone(),
            options: cfg.options.clone(),
            registry: Arc::new(SessionRegistry::new()),
            handler,
            metrics,
            iframe: IframePage::new(&cfg.options.sockjs_url),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    pub fn iframe(&self) -> &IframePage {
        &self.iframe
    }

    /// Existing session only; send endpoints never create one.
    pub fn lookup(&self, id: &str) -> Option<Session> {
        self.registry.get(id)
    }

    /// The session addressed by an HTTP request, created (and its handler
    /// started) on first use.
    pub fn session_by_request(&self, id: &str) -> Session {
        let (session, created) = self
            .registry
            .get_or_create(id, || Session::new(id, self.options.session_config(false)));
        if created {
            self.start(&session, Some(Arc::clone(&self.registry)));
        }
        session
    }

    /// A fresh session owned by one websocket connection. Not registered.
    pub fn standalone_session(&self, raw: bool) -> Session {
        let id = format!("ws-{:016x}", rand::random::<u64>());
        let session = Session::new(id, self.options.session_config(raw));
        self.start(&session, None);
        session
    }

    fn start(&self, session: &Session, registry: Option<Arc<SessionRegistry>>) {
        let labels = [("endpoint", self.prefix.as_str())];
        self.metrics.sessions_opened.inc(&labels);
        self.metrics.sessions_active.inc(&labels);
        tracing::debug!(endpoint = %self.prefix, session = %session.id(), "session created");

        Dispatcher::spawn(Arc::clone(&self.handler), session.clone());

        // reaper
        let session = session.clone();
        let metrics = Arc::clone(&self.metrics);
        let prefix = self.prefix.clone();
        tokio::spawn(async move {
            session.closed_notify().cancelled().await;
            if let Some(registry) = registry {
                registry.remove_if_same(&session);
            }
            metrics.sessions_active.dec(&[("endpoint", prefix.as_str())]);
            tracing::debug!(endpoint = %prefix, session = %session.id(), "session reaped");
        });
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    dispatcher: Dispatcher,
    endpoints: Vec<Arc<Endpoint>>,
    metrics: Arc<ServerMetrics>,
}

impl AppState {
    /// Build state with the built-in services registered.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(EchoService::new()));
        dispatcher.register(Arc::new(CloseService::new()));
        dispatcher.register(Arc::new(ChatService::new()));
        Self::with_dispatcher(cfg, dispatcher)
    }

    /// Build state against a caller-supplied dispatcher. Fails when an
    /// endpoint names a service the dispatcher does not know.
    pub fn with_dispatcher(cfg: ServerConfig, dispatcher: Dispatcher) -> Result<Self> {
        let metrics = Arc::new(ServerMetrics::default());
        let mut endpoints = Vec::with_capacity(cfg.endpoints.len());
        for ep in &cfg.endpoints {
            let handler = dispatcher.get(&ep.service)?;
            tracing::info!(prefix = %ep.prefix, service = %ep.service, "endpoint registered");
            endpoints.push(Arc::new(Endpoint::new(ep, handler, Arc::clone(&metrics))));
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                dispatcher,
                endpoints,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.inner.endpoints
    }

    pub fn endpoint(&self, prefix: &str) -> Option<Arc<Endpoint>> {
        self.inner.endpoints.iter().find(|ep| ep.prefix() == prefix).cloned()
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.inner.metrics
    }
}
