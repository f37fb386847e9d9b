use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatview::cli::{Args, Command, HELP};
use chatview::controller::ChatController;
use chatview::stream::StreamState;
use chatview::terminal::TerminalEcho;
use chatview::theme::FileStore;
use chatview::{chat_page, ClientConfig, SocketTransport};

type Controller = ChatController<SocketTransport>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatview=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig::resolve(&args)?;
    let store = FileStore::open(config.storage_path())?;

    let (transport, mut inbound) = SocketTransport::connect(&config.server_url, config.dialect).await?;
    let mut controller = ChatController::new(chat_page(), transport, Box::new(store), &config)?;
    let mut echo = TerminalEcho::new();
    echo.notice("type a message, or /help");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut online = true;

    loop {
        tokio::select! {
            line = lines.next() => {
                match line {
                    Some(Ok(line)) => {
                        if !handle_line(&mut controller, &mut echo, &config, &line).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                    None => break,
                }
            }
            event = inbound.recv(), if online => {
                match event {
                    Some(event) => {
                        let owed = controller.pending_replies();
                        echo.inbound(&event, owed > 0);
                        if let Err(e) = controller.handle_inbound(event) {
                            echo.error(&e.to_string());
                        }
                        let remaining = controller.pending_replies();
                        if remaining > 0 && remaining < owed {
                            echo.thinking(&config.thinking_label);
                        }
                    }
                    None => {
                        online = false;
                        controller.connection_lost();
                        echo.error("connection lost");
                    }
                }
            }
        }
    }

    if let Some(path) = &args.snapshot {
        std::fs::write(path, controller.to_html())?;
        info!(path = %path.display(), "snapshot written");
    }
    Ok(())
}

/// Apply one stdin line. Returns `false` when the user asked to quit.
async fn handle_line(
    controller: &mut Controller,
    echo: &mut TerminalEcho,
    config: &ClientConfig,
    line: &str,
) -> bool {
    match Command::parse(line) {
        Command::Quit => return false,
        Command::Help => println!("{}", HELP),
        Command::Menu => controller.toggle_menu(),
        Command::Remove => {
            controller.remove_attachment();
            echo.notice("attachment removed");
        }
        Command::Theme => match controller.toggle_theme() {
            Ok(theme) => echo.theme(theme),
            Err(e) => echo.error(&format!("theme not saved: {}", e)),
        },
        Command::Attach(path) => {
            controller.choose_any_file();
            select(controller, echo, &path).await;
        }
        Command::AttachImage(path) => {
            controller.choose_image();
            select(controller, echo, &path).await;
        }
        Command::AttachPdf(path) => {
            controller.choose_pdf();
            select(controller, echo, &path).await;
        }
        Command::Say(text) => {
            controller.set_input_text(&text);
            let text = controller.capture_text();
            let attachment = controller.pending_attachment().cloned();
            let was_streaming = controller.stream_state() == StreamState::Streaming;
            match controller.submit() {
                Ok(true) => {
                    echo.user(&text, attachment.as_ref());
                    if !was_streaming {
                        echo.thinking(&config.thinking_label);
                    }
                }
                Ok(false) => {}
                Err(e) => echo.error(&format!("not sent: {}", e)),
            }
        }
    }
    true
}

async fn select(controller: &mut Controller, echo: &mut TerminalEcho, path: &std::path::Path) {
    match controller.select_file(Some(path)).await {
        Ok(()) => {
            if let Some(att) = controller.pending_attachment() {
                echo.attachment_staged(att);
            }
        }
        Err(e) => echo.error(&format!("could not read {}: {}", path.display(), e)),
    }
}
