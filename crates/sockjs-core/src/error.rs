//! Shared error type across the SockJS crates.

use thiserror::Error;

/// Coarse error classes (stable API).
///
/// Application code only ever needs to distinguish `NotOpen` (normal end of
/// life) from everything else; transports use the remaining classes to decide
/// how to answer the HTTP request that triggered the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Session is closing or closed.
    NotOpen,
    /// Protocol contract violation (second receiver, ...).
    Protocol,
    /// Transport died: I/O failure, write timeout, client went away.
    Transport,
    /// Client payload could not be decoded.
    BadPayload,
    /// Caller gave up waiting.
    Cancelled,
    /// Invalid configuration.
    Config,
    /// Internal server error.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::NotOpen => "NOT_OPEN",
            ErrorClass::Protocol => "PROTOCOL",
            ErrorClass::Transport => "TRANSPORT",
            ErrorClass::BadPayload => "BAD_PAYLOAD",
            ErrorClass::Cancelled => "CANCELLED",
            ErrorClass::Config => "CONFIG",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SockJsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum SockJsError {
    #[error("sockjs: session not in open state")]
    SessionNotOpen,
    #[error("sockjs: another receiver already attached")]
    ReceiverAlreadyAttached,
    #[error("sockjs: operation cancelled")]
    Cancelled,
    #[error("sockjs: receiver interrupted")]
    Interrupted,
    #[error("sockjs: write timed out")]
    WriteTimeout,
    #[error("bad payload: {0}")]
    BadPayload(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SockJsError {
    /// Map the error onto its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            SockJsError::SessionNotOpen => ErrorClass::NotOpen,
            SockJsError::ReceiverAlreadyAttached => ErrorClass::Protocol,
            SockJsError::Interrupted | SockJsError::WriteTimeout => ErrorClass::Transport,
            SockJsError::Cancelled => ErrorClass::Cancelled,
            SockJsError::BadPayload(_) => ErrorClass::BadPayload,
            SockJsError::UnsupportedVersion | SockJsError::InvalidConfig(_) => ErrorClass::Config,
            SockJsError::Internal(_) => ErrorClass::Internal,
        }
    }
}
