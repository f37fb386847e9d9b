//! Incremental rendering of streamed bot replies.
//!
//! ## State machine
//! - `Idle`: no placeholder in the log
//! - `Streaming`: the front placeholder receives chunks before its cursor marker
//!
//! Every submit queues one placeholder, so a reply is owed per user message.
//! Only the front of the queue is active. `finish` and `replace_with_full`
//! retire it and promote the next one; once the queue drains the renderer is
//! Idle again. Chunks and ends that arrive while Idle change nothing.

use std::collections::VecDeque;

use tracing::debug;

use crate::bindings::{classes, ViewBindings};
use crate::dom::{Document, NodeId};
use crate::render::{Message, MessageRenderer};

/// A placeholder waiting for, or receiving, its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder {
    message: NodeId,
    text: NodeId,
    cursor: NodeId,
    /// `true` until the first chunk replaces the thinking label.
    awaiting_first_chunk: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
}

#[derive(Debug, Clone)]
pub struct StreamRenderer {
    thinking_label: String,
    queue: VecDeque<Placeholder>,
}

impl StreamRenderer {
    pub fn new(thinking_label: impl Into<String>) -> Self {
        StreamRenderer {
            thinking_label: thinking_label.into(),
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        if self.queue.is_empty() {
            StreamState::Idle
        } else {
            StreamState::Streaming
        }
    }

    /// Element of the active placeholder, if any.
    pub fn placeholder(&self) -> Option<NodeId> {
        self.queue.front().map(|p| p.message)
    }

    /// Every placeholder still owed a reply, active one first.
    pub fn placeholders(&self) -> Vec<NodeId> {
        self.queue.iter().map(|p| p.message).collect()
    }

    /// Number of replies still owed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Append a thinking placeholder and queue it behind any outstanding ones.
    pub fn open(&mut self, doc: &mut Document, view: &ViewBindings, renderer: &MessageRenderer) -> NodeId {
        let message = doc.create_element("div");
        doc.add_class(message, classes::MESSAGE);
        doc.add_class(message, classes::BOT);
        doc.add_class(message, classes::THINKING);
        let text = doc.create_element("p");
        doc.set_text_content(text, &self.thinking_label);
        let cursor = doc.create_element("span");
        doc.add_class(cursor, classes::CURSOR);
        doc.append_child(text, cursor);
        doc.append_child(message, text);

        renderer.append(doc, view, message, &self.placeholders());
        self.queue.push_back(Placeholder {
            message,
            text,
            cursor,
            awaiting_first_chunk: true,
        });
        debug!(pending = self.queue.len(), "stream placeholder opened");
        message
    }

    /// Append one chunk before the active cursor. Returns `false` when no stream is active.
    pub fn push_chunk(&mut self, doc: &mut Document, view: &ViewBindings, chunk: &str) -> bool {
        let Some(active) = self.queue.front_mut() else {
            debug!("chunk dropped: no active placeholder");
            return false;
        };
        if active.awaiting_first_chunk {
            doc.detach(active.cursor);
            doc.remove_children(active.text);
            doc.append_child(active.text, active.cursor);
            active.awaiting_first_chunk = false;
        }
        let node = doc.create_text(chunk);
        doc.insert_before(active.text, node, active.cursor);
        doc.scroll_to_bottom(view.chat_log);
        true
    }

    /// Finalize the active stream and promote the next placeholder.
    /// Returns `false` when no stream is active.
    pub fn finish(&mut self, doc: &mut Document) -> bool {
        let Some(active) = self.queue.pop_front() else {
            return false;
        };
        doc.remove(active.cursor);
        doc.remove_class(active.message, classes::THINKING);
        debug!(pending = self.queue.len(), "stream finished");
        true
    }

    /// Render `text` as a complete bot message. With a placeholder active the
    /// message takes its place in the log; otherwise it is appended.
    pub fn replace_with_full(
        &mut self,
        doc: &mut Document,
        view: &ViewBindings,
        renderer: &MessageRenderer,
        text: &str,
    ) -> NodeId {
        let Some(active) = self.queue.pop_front() else {
            return renderer.render(doc, view, &Message::bot(text));
        };
        let reply = renderer.build(doc, &Message::bot(text));
        doc.insert_before(view.chat_log, reply, active.message);
        doc.remove(active.message);
        doc.scroll_to_bottom(view.chat_log);
        reply
    }

    /// Remove the most recently opened placeholder without rendering anything.
    pub fn abandon(&mut self, doc: &mut Document) {
        if let Some(last) = self.queue.pop_back() {
            doc.remove(last.message);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
