//! The chat view controller: owns the page, the pending attachment, the stream
//! slot and the theme, and applies user actions and inbound events to them.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::attachment::{accepts, capture_file, mime_from_path, AttachmentKind, PendingAttachment};
use crate::bindings::{classes, ViewBindings};
use crate::config::ClientConfig;
use crate::dom::Document;
use crate::error::{ChatError, Result};
use crate::protocol::{ImageField, Inbound, Outbound, OutboundMessage, FILE_FIELD};
use crate::render::{Message, MessageRenderer};
use crate::stream::{StreamRenderer, StreamState};
use crate::theme::{KeyValueStore, Theme};
use crate::transport::Transport;

/// Accept filter set on the file input by the "attach image" action.
pub const ACCEPT_IMAGES: &str = "image/*";
/// Accept filter set on the file input by the "attach PDF" action.
pub const ACCEPT_PDF: &str = "application/pdf";
/// Body class shown after the connection drops.
pub const OFFLINE_CLASS: &str = "desconectado";

pub struct ChatController<T: Transport> {
    doc: Document,
    view: ViewBindings,
    renderer: MessageRenderer,
    stream: StreamRenderer,
    pending: Option<PendingAttachment>,
    theme: Theme,
    store: Box<dyn KeyValueStore + Send>,
    transport: T,
    handshake_on_connect: bool,
    image_field: ImageField,
    default_image_prompt: String,
    default_document_prompt: String,
    connected: bool,
}

impl<T: Transport> ChatController<T> {
    /// Bind the page, restore the persisted theme and take ownership of the transport.
    ///
    /// Fails if the page lacks any element the controller needs.
    pub fn new(
        mut doc: Document,
        transport: T,
        store: Box<dyn KeyValueStore + Send>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let view = ViewBindings::bind(&doc)?;
        let theme = Theme::load(&*store);
        theme.apply(&mut doc, &view);
        Ok(ChatController {
            doc,
            view,
            renderer: MessageRenderer::new(config.max_messages),
            stream: StreamRenderer::new(config.thinking_label.clone()),
            pending: None,
            theme,
            store,
            transport,
            handshake_on_connect: config.handshake_on_connect,
            image_field: config.image_field,
            default_image_prompt: config.default_image_prompt.clone(),
            default_document_prompt: config.default_document_prompt.clone(),
            connected: false,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn view(&self) -> &ViewBindings {
        &self.view
    }

    pub fn pending_attachment(&self) -> Option<&PendingAttachment> {
        self.pending.as_ref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    /// Replies still owed for messages already sent.
    pub fn pending_replies(&self) -> usize {
        self.stream.pending()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of message elements in the log.
    pub fn message_count(&self) -> usize {
        self.doc.child_elements(self.view.chat_log).len()
    }

    /// The whole page as HTML.
    pub fn to_html(&self) -> String {
        self.doc.to_html(self.doc.body())
    }

    // -----------------------------------------------------------------------
    // Input capture
    // -----------------------------------------------------------------------

    /// Replace the text field's content, as typing would.
    pub fn set_input_text(&mut self, text: &str) {
        self.doc.set_value(self.view.message_input, text);
    }

    /// Trimmed content of the text field.
    pub fn capture_text(&self) -> String {
        self.doc.value(self.view.message_input).trim().to_string()
    }

    pub fn toggle_menu(&mut self) {
        self.doc.toggle_class(self.view.attach_menu, classes::HIDDEN);
    }

    /// Restrict the file picker to images and close the menu.
    pub fn choose_image(&mut self) {
        self.doc.set_attribute(self.view.file_input, "accept", ACCEPT_IMAGES);
        self.doc.add_class(self.view.attach_menu, classes::HIDDEN);
    }

    /// Restrict the file picker to PDFs and close the menu.
    pub fn choose_pdf(&mut self) {
        self.doc.set_attribute(self.view.file_input, "accept", ACCEPT_PDF);
        self.doc.add_class(self.view.attach_menu, classes::HIDDEN);
    }

    /// Lift any accept filter and close the menu.
    pub fn choose_any_file(&mut self) {
        self.doc.remove_attribute(self.view.file_input, "accept");
        self.doc.add_class(self.view.attach_menu, classes::HIDDEN);
    }

    /// Read the selected file and stage it. `None` selection changes nothing.
    /// A file outside the accept filter, or one that cannot be read, is
    /// returned as an error and leaves the current attachment in place.
    pub async fn select_file(&mut self, selection: Option<&Path>) -> Result<()> {
        if let Some(path) = selection {
            self.check_accept(path)?;
        }
        match capture_file(selection).await {
            Ok(Some(attachment)) => {
                self.stage_attachment(attachment);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(error = %e, "file selection failed");
                Err(e)
            }
        }
    }

    fn check_accept(&self, path: &Path) -> Result<()> {
        let Some(filter) = self.doc.attribute(self.view.file_input, "accept") else {
            return Ok(());
        };
        let mime_type = mime_from_path(path);
        if accepts(filter, &mime_type) {
            return Ok(());
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        warn!(file = %filename, mime = %mime_type, accept = filter, "file rejected by accept filter");
        Err(ChatError::UnacceptedFile {
            filename,
            accept: filter.to_string(),
        })
    }

    /// Stage an attachment, replacing any pending one, and show its preview.
    pub fn stage_attachment(&mut self, attachment: PendingAttachment) {
        debug!(file = %attachment.filename, mime = %attachment.mime_type, "attachment staged");
        self.doc.set_value(self.view.file_input, &attachment.filename);
        match attachment.kind() {
            AttachmentKind::Image => {
                self.doc.set_attribute(self.view.preview_image, "src", &attachment.payload);
                self.doc.remove_class(self.view.preview_image, classes::HIDDEN);
                self.doc.add_class(self.view.preview_document_name, classes::HIDDEN);
            }
            AttachmentKind::Document | AttachmentKind::Other => {
                self.doc.set_text_content(self.view.preview_document_name, &attachment.filename);
                self.doc.add_class(self.view.preview_image, classes::HIDDEN);
                self.doc.remove_class(self.view.preview_document_name, classes::HIDDEN);
            }
        }
        self.doc.remove_class(self.view.preview, classes::HIDDEN);
        self.pending = Some(attachment);
    }

    /// Drop the pending attachment and reset the file input so the same file can be picked again.
    pub fn remove_attachment(&mut self) {
        self.pending = None;
        self.doc.set_value(self.view.file_input, "");
        self.doc.add_class(self.view.preview, classes::HIDDEN);
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Render the composed message, open a placeholder and send it.
    ///
    /// Returns `Ok(false)` when there is nothing to send.
    pub fn submit(&mut self) -> Result<bool> {
        let text = self.capture_text();
        if text.is_empty() && self.pending.is_none() {
            return Ok(false);
        }

        let attachment = self.pending.clone();
        self.renderer.render_keeping(
            &mut self.doc,
            &self.view,
            &Message::user(&text, attachment.clone()),
            &self.stream.placeholders(),
        );
        self.stream.open(&mut self.doc, &self.view, &self.renderer);

        let outbound = self.outbound_message(text, attachment);
        if let Err(e) = self.transport.emit(Outbound::Send(outbound)) {
            warn!(error = %e, "send failed");
            self.stream.abandon(&mut self.doc);
            return Err(e);
        }

        self.set_input_text("");
        self.remove_attachment();
        Ok(true)
    }

    fn outbound_message(&self, text: String, attachment: Option<PendingAttachment>) -> OutboundMessage {
        let kind = attachment.as_ref().map(PendingAttachment::kind);
        let text = match kind {
            Some(_) if !text.is_empty() => text,
            Some(AttachmentKind::Image) => self.default_image_prompt.clone(),
            Some(_) => self.default_document_prompt.clone(),
            None => text,
        };
        let attachment = attachment.map(|att| {
            let field = match att.kind() {
                AttachmentKind::Image => self.image_field.name(),
                _ => FILE_FIELD,
            };
            (field, att.payload)
        });
        OutboundMessage { text, attachment }
    }

    // -----------------------------------------------------------------------
    // Theme
    // -----------------------------------------------------------------------

    /// Flip the display mode and persist it.
    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggled();
        next.apply(&mut self.doc, &self.view);
        next.persist(&mut *self.store)?;
        self.theme = next;
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Inbound events
    // -----------------------------------------------------------------------

    /// Apply one inbound event. Events are expected in transport order.
    pub fn handle_inbound(&mut self, event: Inbound) -> Result<()> {
        match event {
            Inbound::Connected => {
                info!("connected to chat server");
                self.connected = true;
                self.doc.remove_class(self.view.body, OFFLINE_CLASS);
                if self.handshake_on_connect {
                    self.transport.emit(Outbound::Handshake)?;
                }
            }
            Inbound::StreamChunk(chunk) => {
                self.stream.push_chunk(&mut self.doc, &self.view, &chunk);
            }
            Inbound::StreamEnd => {
                self.stream.finish(&mut self.doc);
            }
            Inbound::FullResponse(text) => {
                self.stream
                    .replace_with_full(&mut self.doc, &self.view, &self.renderer, &text);
            }
        }
        Ok(())
    }

    /// Mark the page offline. Any partial reply stays as rendered.
    pub fn connection_lost(&mut self) {
        warn!("connection lost");
        self.connected = false;
        self.doc.add_class(self.view.body, OFFLINE_CLASS);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
