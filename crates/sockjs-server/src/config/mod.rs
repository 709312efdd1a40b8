//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use sockjs_core::{Result, SockJsError};

pub use schema::{EndpointConfig, EndpointOptions, ServerConfig, ServerSection, HTTP_TRANSPORTS};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SockJsError::InvalidConfig(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| SockJsError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
