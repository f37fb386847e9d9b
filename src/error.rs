//! Crate-level error type.

use thiserror::Error;

/// Every fallible operation in the crate returns this error.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A view handle required at startup is not present in the document.
    #[error("missing view element '#{id}'")]
    MissingElement { id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The string is not a `data:<mime>;base64,<payload>` URL.
    #[error("invalid data URL: {reason}")]
    InvalidDataUrl { reason: String },

    /// The selected file falls outside the picker's accept filter.
    #[error("'{filename}' is not accepted here (expected {accept})")]
    UnacceptedFile { filename: String, accept: String },

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The socket writer task has exited; nothing more can be sent.
    #[error("transport closed")]
    TransportClosed,
}

pub type Result<T> = std::result::Result<T, ChatError>;
