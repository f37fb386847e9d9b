//! Streaming chat client: compose text or attach an image/PDF, send it over a
//! WebSocket, and render streamed or whole replies into a retained chat log.

pub mod attachment;
pub mod bindings;
pub mod cli;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod protocol;
pub mod render;
pub mod stream;
pub mod terminal;
pub mod theme;
pub mod transport;

pub use attachment::{DataUrl, PendingAttachment};
pub use bindings::{chat_page, ViewBindings};
pub use config::ClientConfig;
pub use controller::ChatController;
pub use error::{ChatError, Result};
pub use protocol::{Inbound, Outbound, WireDialect};
pub use transport::{SocketTransport, Transport};
