//! Terminal echo of the chat log for the `chatview` binary.

use std::io::{self, Write};

use colored::*;

use crate::attachment::{AttachmentKind, PendingAttachment};
use crate::protocol::Inbound;
use crate::theme::Theme;

/// Prints what the controller renders, as it happens.
#[derive(Debug, Default)]
pub struct TerminalEcho {
    /// The first chunk of a stream overwrites the thinking line.
    awaiting_first_chunk: bool,
}

impl TerminalEcho {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&mut self, text: &str, attachment: Option<&PendingAttachment>) {
        println!("{}", format_user(text, attachment));
    }

    pub fn thinking(&mut self, label: &str) {
        print!("{} {}", "bot>".bright_green().bold(), label.dimmed());
        let _ = io::stdout().flush();
        self.awaiting_first_chunk = true;
    }

    /// Echo an inbound event. `streaming` is the controller state before the event was applied.
    pub fn inbound(&mut self, event: &Inbound, streaming: bool) {
        match event {
            Inbound::Connected => println!("{}", "  connected".bright_blue()),
            Inbound::StreamChunk(chunk) if streaming => {
                if self.awaiting_first_chunk {
                    print!("\r\x1b[2K{} ", "bot>".bright_green().bold());
                    self.awaiting_first_chunk = false;
                }
                print!("{}", chunk);
                let _ = io::stdout().flush();
            }
            Inbound::StreamEnd if streaming => {
                println!();
                self.awaiting_first_chunk = false;
            }
            Inbound::FullResponse(text) => {
                if streaming {
                    print!("\r\x1b[2K");
                }
                println!("{} {}", "bot>".bright_green().bold(), text);
                self.awaiting_first_chunk = false;
            }
            _ => {}
        }
    }

    pub fn attachment_staged(&mut self, attachment: &PendingAttachment) {
        println!(
            "{}",
            format!("  attached {} ({})", attachment.filename, attachment.mime_type).bright_cyan()
        );
    }

    pub fn notice(&mut self, text: &str) {
        println!("{}", format!("  {}", text).bright_blue());
    }

    pub fn error(&mut self, text: &str) {
        eprintln!("{}", format!("  {}", text).bright_red());
    }

    pub fn theme(&mut self, theme: Theme) {
        let label = match theme {
            Theme::Dark => "dark mode",
            Theme::Light => "light mode",
        };
        self.notice(label);
    }
}

/// One-line rendition of a user message.
pub fn format_user(text: &str, attachment: Option<&PendingAttachment>) -> String {
    let mut line = format!("{}", "you>".bright_yellow().bold());
    if !text.is_empty() {
        line.push(' ');
        line.push_str(text);
    }
    if let Some(att) = attachment {
        let tag = match att.kind() {
            AttachmentKind::Image => format!("[image: {}]", att.filename),
            AttachmentKind::Document => format!("[pdf: {}]", att.filename),
            AttachmentKind::Other => format!("[file: {}]", att.filename),
        };
        line.push(' ');
        line.push_str(&tag.cyan().to_string());
    }
    line
}
