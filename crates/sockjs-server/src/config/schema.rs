use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use sockjs_core::{Result, SockJsError};

use crate::session::SessionConfig;

/// HTTP transports an endpoint can serve besides websocket.
pub const HTTP_TRANSPORTS: [&str; 5] = ["xhr", "xhr_streaming", "eventsource", "htmlfile", "jsonp"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SockJsError::UnsupportedVersion);
        }
        if self.endpoints.is_empty() {
            return Err(SockJsError::InvalidConfig("endpoints must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for ep in &self.endpoints {
            ep.validate()?;
            if !seen.insert(ep.prefix.as_str()) {
                return Err(SockJsError::InvalidConfig(format!(
                    "duplicate endpoint prefix: {}",
                    ep.prefix
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8081".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub prefix: String,
    /// Name of the registered application handler.
    pub service: String,
    #[serde(default)]
    pub options: EndpointOptions,
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.starts_with('/') {
            return Err(SockJsError::InvalidConfig(format!(
                "endpoint prefix must start with '/': {}",
                self.prefix
            )));
        }
        if self.prefix.len() > 1 && self.prefix.ends_with('/') {
            return Err(SockJsError::InvalidConfig(format!(
                "endpoint prefix must not end with '/': {}",
                self.prefix
            )));
        }
        if self.service.is_empty() {
            return Err(SockJsError::InvalidConfig(format!(
                "endpoint {} has no service",
                self.prefix
            )));
        }
        self.options.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointOptions {
    #[serde(default = "default_heartbeat_delay_ms")]
    pub heartbeat_delay_ms: u64,

    #[serde(default = "default_disconnect_delay_ms")]
    pub disconnect_delay_ms: u64,

    /// Bytes a streaming response may carry before the client must reconnect.
    #[serde(default = "default_response_limit")]
    pub response_limit: usize,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub websocket: bool,

    #[serde(default)]
    pub raw_websocket: bool,

    #[serde(default)]
    pub cookie_needed: bool,

    #[serde(default = "default_sockjs_url")]
    pub sockjs_url: String,

    /// Allowed HTTP transports. Empty means all of them.
    #[serde(default)]
    pub transports: Vec<String>,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            heartbeat_delay_ms: default_heartbeat_delay_ms(),
            disconnect_delay_ms: default_disconnect_delay_ms(),
            response_limit: default_response_limit(),
            write_timeout_ms: default_write_timeout_ms(),
            websocket: true,
            raw_websocket: false,
            cookie_needed: false,
            sockjs_url: default_sockjs_url(),
            transports: Vec::new(),
        }
    }
}

impl EndpointOptions {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.disconnect_delay_ms) {
            return Err(SockJsError::InvalidConfig(
                "options.disconnect_delay_ms must be between 100 and 600000".into(),
            ));
        }
        if self.heartbeat_delay_ms != 0 && !(100..=600000).contains(&self.heartbeat_delay_ms) {
            return Err(SockJsError::InvalidConfig(
                "options.heartbeat_delay_ms must be 0 or between 100 and 600000".into(),
            ));
        }
        if self.response_limit == 0 {
            return Err(SockJsError::InvalidConfig(
                "options.response_limit must be at least 1".into(),
            ));
        }
        if !(100..=120000).contains(&self.write_timeout_ms) {
            return Err(SockJsError::InvalidConfig(
                "options.write_timeout_ms must be between 100 and 120000".into(),
            ));
        }
        for t in &self.transports {
            if !HTTP_TRANSPORTS.contains(&t.as_str()) {
                return Err(SockJsError::InvalidConfig(format!("unknown transport: {t}")));
            }
        }
        Ok(())
    }

    pub fn transport_enabled(&self, name: &str) -> bool {
        self.transports.is_empty() || self.transports.iter().any(|t| t == name)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Session timing for sessions created under this endpoint.
    pub fn session_config(&self, raw: bool) -> SessionConfig {
        SessionConfig {
            heartbeat_delay: Duration::from_millis(self.heartbeat_delay_ms),
            disconnect_delay: Duration::from_millis(self.disconnect_delay_ms),
            raw,
        }
    }
}

fn default_heartbeat_delay_ms() -> u64 {
    25000
}
fn default_disconnect_delay_ms() -> u64 {
    5000
}
fn default_response_limit() -> usize {
    128 * 1024
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_true() -> bool {
    true
}
fn default_sockjs_url() -> String {
    "//cdnjs.cloudflare.com/ajax/libs/sockjs-client/1.6.1/sockjs.min.js".into()
}
