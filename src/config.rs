//! Client configuration loaded from TOML, with CLI overrides applied on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::Result;
use crate::protocol::{ImageField, WireDialect};

/// Environment variable consulted when no `--server` flag is given.
pub const SERVER_ENV: &str = "CHATVIEW_SERVER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat server.
    pub server_url: String,
    pub dialect: WireDialect,
    /// Emit the `conectar` handshake as soon as the socket opens.
    pub handshake_on_connect: bool,
    /// Outbound field used for image attachments.
    pub image_field: ImageField,
    /// Label shown in the placeholder before the first chunk arrives.
    pub thinking_label: String,
    /// Text sent when only an image is attached.
    pub default_image_prompt: String,
    /// Text sent when only a non-image file is attached.
    pub default_document_prompt: String,
    /// Upper bound on rendered messages; `None` keeps them all.
    pub max_messages: Option<usize>,
    /// Key/value file holding the theme flag. Defaults to `~/.chatview/storage.json`.
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "ws://127.0.0.1:8080/ws".to_string(),
            dialect: WireDialect::Portuguese,
            handshake_on_connect: false,
            image_field: ImageField::Arquivo,
            thinking_label: "Pensando...".to_string(),
            default_image_prompt: "Descreva esta imagem para mim.".to_string(),
            default_document_prompt: "Resuma o conteúdo deste PDF para mim.".to_string(),
            max_messages: None,
            storage_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolve the effective config: file (if any), then env, then CLI flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(SERVER_ENV) {
            if !url.is_empty() {
                config.server_url = url;
            }
        }
        config.apply_args(args);
        Ok(config)
    }

    /// Overlay the flags the user passed explicitly.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.server {
            self.server_url = url.clone();
        }
        if let Some(dialect) = args.dialect {
            self.dialect = dialect;
        }
        if args.handshake {
            self.handshake_on_connect = true;
        }
        if let Some(path) = &args.storage {
            self.storage_path = Some(path.clone());
        }
        if let Some(max) = args.max_messages {
            self.max_messages = Some(max);
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".chatview")
                .join("storage.json")
        })
    }
}
