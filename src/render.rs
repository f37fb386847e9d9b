//! Message rendering into the chat log.

use tracing::warn;

use crate::attachment::{AttachmentKind, DataUrl, PendingAttachment};
use crate::bindings::{classes, ViewBindings};
use crate::dom::{Document, NodeId};
use crate::error::Result;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn class(self) -> &'static str {
        match self {
            Role::User => classes::USER,
            Role::Bot => classes::BOT,
        }
    }
}

/// A message to render. Not retained after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: Option<String>,
    pub role: Role,
    pub attachment: Option<PendingAttachment>,
}

impl Message {
    pub fn user(text: &str, attachment: Option<PendingAttachment>) -> Self {
        Message {
            text: (!text.is_empty()).then(|| text.to_string()),
            role: Role::User,
            attachment,
        }
    }

    pub fn bot(text: &str) -> Self {
        Message {
            text: Some(text.to_string()),
            role: Role::Bot,
            attachment: None,
        }
    }
}

/// Appends message elements to the log and keeps it scrolled to the bottom.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRenderer {
    /// Oldest messages beyond this count are pruned. `None` keeps everything.
    pub max_messages: Option<usize>,
}

impl MessageRenderer {
    pub fn new(max_messages: Option<usize>) -> Self {
        MessageRenderer { max_messages }
    }

    /// Render `message` and return its element.
    pub fn render(&self, doc: &mut Document, view: &ViewBindings, message: &Message) -> NodeId {
        self.render_keeping(doc, view, message, &[])
    }

    /// Like [`MessageRenderer::render`], but elements in `keep` survive pruning.
    pub fn render_keeping(
        &self,
        doc: &mut Document,
        view: &ViewBindings,
        message: &Message,
        keep: &[NodeId],
    ) -> NodeId {
        let el = self.build(doc, message);
        self.append(doc, view, el, keep);
        el
    }

    /// Build the element for `message` without attaching it to the log.
    pub fn build(&self, doc: &mut Document, message: &Message) -> NodeId {
        let el = doc.create_element("div");
        doc.add_class(el, classes::MESSAGE);
        doc.add_class(el, message.role.class());

        if let Some(text) = &message.text {
            let p = doc.create_element("p");
            doc.set_text_content(p, text);
            doc.append_child(el, p);
        }

        if let Some(att) = &message.attachment {
            match att.kind() {
                AttachmentKind::Image => {
                    let img = doc.create_element("img");
                    doc.set_attribute(img, "src", &att.payload);
                    doc.append_child(el, img);
                }
                AttachmentKind::Document => {
                    if let Err(e) = append_document_link(doc, el, att) {
                        warn!(file = %att.filename, error = %e, "document attachment not rendered");
                    }
                }
                AttachmentKind::Other => {}
            }
        }
        el
    }

    /// Append an already-built message element, then prune and scroll.
    /// Neither `el` nor anything in `keep` is pruned.
    pub fn append(&self, doc: &mut Document, view: &ViewBindings, el: NodeId, keep: &[NodeId]) {
        doc.append_child(view.chat_log, el);
        self.prune(doc, view, el, keep);
        doc.scroll_to_bottom(view.chat_log);
    }

    fn prune(&self, doc: &mut Document, view: &ViewBindings, newest: NodeId, keep: &[NodeId]) {
        let Some(max) = self.max_messages else {
            return;
        };
        let messages = doc.child_elements(view.chat_log);
        let excess = messages.len().saturating_sub(max);
        let prunable = messages
            .into_iter()
            .filter(|m| *m != newest && !keep.contains(m));
        for old in prunable.take(excess) {
            release_object_urls(doc, old);
            doc.remove(old);
        }
    }
}

/// Build the download link for a document attachment.
fn append_document_link(doc: &mut Document, parent: NodeId, att: &PendingAttachment) -> Result<()> {
    let data = DataUrl::parse(&att.payload)?;
    let bytes = data.decode()?;
    let url = doc.create_object_url(bytes, data.mime_type());

    let link = doc.create_element("a");
    doc.set_attribute(link, "href", &url);
    doc.set_attribute(link, "target", "_blank");
    doc.set_attribute(link, "rel", "noopener noreferrer");
    doc.add_class(link, classes::DOCUMENT_LINK);
    let label = doc.create_element("span");
    doc.set_text_content(label, &att.filename);
    doc.append_child(link, label);
    doc.append_child(parent, link);
    Ok(())
}

fn release_object_urls(doc: &mut Document, el: NodeId) {
    let urls: Vec<String> = doc
        .descendants(el)
        .into_iter()
        .filter_map(|n| doc.attribute(n, "href"))
        .filter(|href| href.starts_with("blob:"))
        .map(str::to_string)
        .collect();
    for url in urls {
        doc.revoke_object_url(&url);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::chat_page;

    fn setup() -> (Document, ViewBindings) {
        let doc = chat_page();
        let view = ViewBindings::bind(&doc).unwrap();
        (doc, view)
    }

    #[test]
    fn test_render_text_message() {
        let (mut doc, view) = setup();
        let el = MessageRenderer::default().render(&mut doc, &view, &Message::user("oi", None));
        assert!(doc.has_class(el, classes::MESSAGE));
        assert!(doc.has_class(el, classes::USER));
        assert_eq!(doc.text_content(el), "oi");
        assert_eq!(doc.child_elements(view.chat_log), vec![el]);
    }

    #[test]
    fn test_render_escapes_markup() {
        let (mut doc, view) = setup();
        let el = MessageRenderer::default().render(
            &mut doc,
            &view,
            &Message::bot("<script>alert(1)</script>"),
        );
        let html = doc.to_html(el);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_image_attachment_without_text() {
        let (mut doc, view) = setup();
        let att = PendingAttachment::from_bytes("a.png", "image/png", b"png");
        let el = MessageRenderer::default().render(&mut doc, &view, &Message::user("", Some(att.clone())));
        let kids = doc.child_elements(el);
        assert_eq!(kids.len(), 1);
        assert_eq!(doc.tag(kids[0]), Some("img"));
        assert_eq!(doc.attribute(kids[0], "src"), Some(att.payload.as_str()));
    }

    #[test]
    fn test_render_document_attachment_creates_blob_link() {
        let (mut doc, view) = setup();
        let att = PendingAttachment::from_bytes("report.pdf", "application/pdf", b"%PDF-1.4");
        let el = MessageRenderer::default().render(&mut doc, &view, &Message::user("leia", Some(att)));
        let link = doc.find_by_class(el, classes::DOCUMENT_LINK).unwrap();
        assert_eq!(doc.attribute(link, "target"), Some("_blank"));
        assert_eq!(doc.attribute(link, "rel"), Some("noopener noreferrer"));
        assert_eq!(doc.text_content(link), "report.pdf");
        let href = doc.attribute(link, "href").unwrap().to_string();
        let blob = doc.blob(&href).unwrap();
        assert_eq!(blob.mime_type, "application/pdf");
        assert_eq!(blob.bytes, b"%PDF-1.4".to_vec());
    }

    #[test]
    fn test_render_malformed_document_keeps_text() {
        let (mut doc, view) = setup();
        let att = PendingAttachment {
            payload: "not a data url".into(),
            filename: "x.pdf".into(),
            mime_type: "application/pdf".into(),
        };
        let el = MessageRenderer::default().render(&mut doc, &view, &Message::user("hi", Some(att)));
        assert_eq!(doc.text_content(el), "hi");
        assert!(doc.find_by_class(el, classes::DOCUMENT_LINK).is_none());
        assert_eq!(doc.object_url_count(), 0);
    }

    #[test]
    fn test_render_scrolls_to_bottom() {
        let (mut doc, view) = setup();
        let r = MessageRenderer::default();
        r.render(&mut doc, &view, &Message::user("a", None));
        r.render(&mut doc, &view, &Message::bot("b\nc"));
        assert_eq!(doc.scroll_top(view.chat_log), doc.scroll_height(view.chat_log));
        assert_eq!(doc.scroll_top(view.chat_log), 3);
    }

    #[test]
    fn test_bounded_log_prunes_oldest() {
        let (mut doc, view) = setup();
        let r = MessageRenderer::new(Some(2));
        r.render(&mut doc, &view, &Message::user("1", None));
        r.render(&mut doc, &view, &Message::user("2", None));
        r.render(&mut doc, &view, &Message::user("3", None));
        let texts: Vec<String> = doc
            .child_elements(view.chat_log)
            .into_iter()
            .map(|m| doc.text_content(m))
            .collect();
        assert_eq!(texts, vec!["2", "3"]);
    }

    #[test]
    fn test_pruning_revokes_object_urls() {
        let (mut doc, view) = setup();
        let r = MessageRenderer::new(Some(1));
        let att = PendingAttachment::from_bytes("a.pdf", "application/pdf", b"x");
        r.render(&mut doc, &view, &Message::user("", Some(att)));
        assert_eq!(doc.object_url_count(), 1);
        r.render(&mut doc, &view, &Message::bot("ok"));
        assert_eq!(doc.object_url_count(), 0);
    }

    #[test]
    fn test_pruning_spares_kept_element() {
        let (mut doc, view) = setup();
        let r = MessageRenderer::new(Some(1));
        let first = r.render(&mut doc, &view, &Message::bot("placeholder"));
        let second = r.render_keeping(&mut doc, &view, &Message::user("next", None), &[first]);
        assert_eq!(doc.child_elements(view.chat_log), vec![first, second]);
    }
}
