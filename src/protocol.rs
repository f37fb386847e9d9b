//! Wire vocabulary and JSON envelopes exchanged with the chat server.
//!
//! Every frame is `{"event": "<name>", "data": <payload>}`. The event names and
//! the text/reply field names depend on the [`WireDialect`] chosen for the session.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Event name of a streamed fragment.
pub const STREAM_CHUNK: &str = "stream_chunk";
/// Event name closing a streamed reply.
pub const STREAM_END: &str = "stream_end";
/// Handshake event some servers expect right after connecting.
pub const HANDSHAKE: &str = "conectar";

/// Field name for document attachments (and images, by default).
pub const FILE_FIELD: &str = "arquivo";
/// Older field name some servers read images from.
pub const IMAGE_FIELD: &str = "imagem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireDialect {
    #[default]
    Portuguese,
    English,
}

impl WireDialect {
    pub fn send_event(self) -> &'static str {
        match self {
            WireDialect::Portuguese => "enviar_mensagem",
            WireDialect::English => "handle_message",
        }
    }

    pub fn text_field(self) -> &'static str {
        match self {
            WireDialect::Portuguese => "mensagem",
            WireDialect::English => "message",
        }
    }

    pub fn response_event(self) -> &'static str {
        match self {
            WireDialect::Portuguese => "resposta_servidor",
            WireDialect::English => "server_response",
        }
    }

    pub fn reply_field(self) -> &'static str {
        match self {
            WireDialect::Portuguese => "resposta",
            WireDialect::English => "reply",
        }
    }
}

impl std::fmt::Display for WireDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireDialect::Portuguese => write!(f, "portuguese"),
            WireDialect::English => write!(f, "english"),
        }
    }
}

/// Which outbound field carries an image attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageField {
    #[default]
    Arquivo,
    Imagem,
}

impl ImageField {
    pub fn name(self) -> &'static str {
        match self {
            ImageField::Arquivo => FILE_FIELD,
            ImageField::Imagem => IMAGE_FIELD,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A message submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    /// `(field name, data URL)`; at most one attachment per message.
    pub attachment: Option<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Handshake,
    Send(OutboundMessage),
}

impl Outbound {
    /// Encode as a JSON frame in the given dialect.
    pub fn to_frame(&self, dialect: WireDialect) -> Value {
        match self {
            Outbound::Handshake => json!({ "event": HANDSHAKE }),
            Outbound::Send(msg) => {
                let mut data = Map::new();
                data.insert(dialect.text_field().to_string(), Value::String(msg.text.clone()));
                if let Some((field, payload)) = &msg.attachment {
                    data.insert((*field).to_string(), Value::String(payload.clone()));
                }
                json!({ "event": dialect.send_event(), "data": data })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Raised by the transport when the socket opens. Never decoded from a frame.
    Connected,
    StreamChunk(String),
    StreamEnd,
    FullResponse(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl Inbound {
    /// Decode a text frame. Unknown events and malformed payloads yield `None`.
    pub fn from_frame(text: &str, dialect: WireDialect) -> Option<Self> {
        let envelope: Envelope = serde_json::from_str(text).ok()?;
        let field = |name: &str| envelope.data.get(name).and_then(Value::as_str).map(str::to_string);
        match envelope.event.as_str() {
            STREAM_CHUNK => field("chunk").map(Inbound::StreamChunk),
            STREAM_END => Some(Inbound::StreamEnd),
            e if e == dialect.response_event() => {
                field(dialect.reply_field()).map(Inbound::FullResponse)
            }
            _ => None,
        }
    }

    /// Encode as a JSON frame in the given dialect, the way a server would send it.
    /// `Connected` is local-only and has no frame.
    pub fn to_frame(&self, dialect: WireDialect) -> Option<Value> {
        let frame = match self {
            Inbound::Connected => return None,
            Inbound::StreamChunk(chunk) => json!({ "event": STREAM_CHUNK, "data": { "chunk": chunk } }),
            Inbound::StreamEnd => json!({ "event": STREAM_END }),
            Inbound::FullResponse(text) => {
                let mut data = Map::new();
                data.insert(dialect.reply_field().to_string(), Value::String(text.clone()));
                json!({ "event": dialect.response_event(), "data": data })
            }
        };
        Some(frame)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
