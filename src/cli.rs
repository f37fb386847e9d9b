use std::path::PathBuf;

use clap::Parser;

use crate::protocol::WireDialect;

#[derive(Parser, Debug)]
#[command(name = "chatview")]
#[command(version)]
#[command(about = "A streaming chat client with image and PDF attachments")]
pub struct Args {
    /// WebSocket URL of the chat server (overrides config and CHATVIEW_SERVER)
    #[arg(long)]
    pub server: Option<String>,

    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Wire vocabulary spoken by the server
    #[arg(long, value_enum)]
    pub dialect: Option<WireDialect>,

    /// Emit the `conectar` handshake right after connecting
    #[arg(long)]
    pub handshake: bool,

    /// Key/value file holding the theme preference
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Keep at most this many messages in the log
    #[arg(long)]
    pub max_messages: Option<usize>,

    /// Write the chat log as HTML to this file on exit
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Attach(PathBuf),
    AttachImage(PathBuf),
    AttachPdf(PathBuf),
    Remove,
    Menu,
    Theme,
    Help,
    Quit,
}

impl Command {
    /// Interpret one input line. Unknown slash commands are sent as text.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (trimmed, ""),
        };
        match (head, rest.is_empty()) {
            ("/attach", false) => Command::Attach(PathBuf::from(rest)),
            ("/image", false) => Command::AttachImage(PathBuf::from(rest)),
            ("/pdf", false) => Command::AttachPdf(PathBuf::from(rest)),
            ("/remove", true) => Command::Remove,
            ("/menu", true) => Command::Menu,
            ("/theme", true) => Command::Theme,
            ("/help", true) => Command::Help,
            ("/quit", true) | ("/exit", true) => Command::Quit,
            _ => Command::Say(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
  /image PATH   attach an image
  /pdf PATH     attach a PDF
  /attach PATH  attach any file
  /remove       drop the pending attachment
  /menu         toggle the attach menu
  /theme        toggle light/dark mode
  /quit         exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_minimal() {
        let args = Args::parse_from(["chatview"]);
        assert_eq!(args.server, None);
        assert_eq!(args.dialect, None);
        assert!(!args.handshake);
        assert_eq!(args.snapshot, None);
    }

    #[test]
    fn test_args_parse_full() {
        let args = Args::parse_from([
            "chatview",
            "--server",
            "ws://localhost:9000/ws",
            "--dialect",
            "portuguese",
            "--snapshot",
            "log.html",
        ]);
        assert_eq!(args.server.as_deref(), Some("ws://localhost:9000/ws"));
        assert_eq!(args.dialect, Some(WireDialect::Portuguese));
        assert_eq!(args.snapshot, Some(PathBuf::from("log.html")));
    }

    #[test]
    fn test_args_rejects_unknown_dialect() {
        assert!(Args::try_parse_from(["chatview", "--dialect", "latin"]).is_err());
    }

    #[test]
    fn test_command_plain_text_is_say() {
        assert_eq!(Command::parse("olá"), Command::Say("olá".into()));
    }

    #[test]
    fn test_command_attach_variants() {
        assert_eq!(Command::parse("/image cat.png"), Command::AttachImage("cat.png".into()));
        assert_eq!(Command::parse("/pdf  a b.pdf "), Command::AttachPdf("a b.pdf".into()));
        assert_eq!(Command::parse("/attach x"), Command::Attach("x".into()));
    }

    #[test]
    fn test_command_attach_without_path_is_text() {
        assert_eq!(Command::parse("/image"), Command::Say("/image".into()));
    }

    #[test]
    fn test_command_keywords() {
        assert_eq!(Command::parse("/remove"), Command::Remove);
        assert_eq!(Command::parse("/theme"), Command::Theme);
        assert_eq!(Command::parse(" /quit "), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/menu"), Command::Menu);
        assert_eq!(Command::parse("/help"), Command::Help);
    }

    #[test]
    fn test_command_keyword_with_argument_is_text() {
        assert_eq!(Command::parse("/theme dark"), Command::Say("/theme dark".into()));
    }
}
