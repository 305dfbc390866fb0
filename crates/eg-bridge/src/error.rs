//! Bridge error types

use eg_core::ActionError;
use thiserror::Error;

/// Errors surfaced by transports and the episode controller
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not connect to bridge at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bridge closed the connection")]
    PeerClosed,

    #[error("connection is closed")]
    Closed,

    #[error("step called before reset")]
    NotReset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bridge message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("unexpected response to {command}: {reason}")]
    UnexpectedResponse {
        command: &'static str,
        reason: String,
    },

    #[error("emulator host error: {0}")]
    Host(String),

    #[error("invalid action: {0}")]
    Action(#[from] ActionError),

    #[error("invalid config {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    /// Whether the connection that produced this error is gone for good
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BridgeError::PeerClosed | BridgeError::Closed | BridgeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
