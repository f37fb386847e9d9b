//! Retained element tree for the chat page.
//!
//! ## Design
//! - Nodes live in an arena of generational slots addressed by [`NodeId`];
//!   freed slots are reused and stale handles stop resolving
//! - A node is either an element (tag, id, classes, attributes, value) or a text node
//! - Removing a node frees its whole subtree; detaching keeps it alive for re-insertion
//! - Text is stored literally and escaped only when serialized with [`Document::to_html`]
//! - Binary payloads can be registered under transient `blob:` object URLs

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

/// Handle to a node in a [`Document`]. Stale handles are tolerated by every method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// Element payload: everything except tree links.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Form-control value (text fields, file inputs).
    pub value: String,
    pub scroll_top: usize,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Cached line count of the subtree; cleared whenever its text changes.
    rows: Cell<Option<usize>>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            parent: None,
            children: Vec::new(),
            rows: Cell::new(None),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// A binary object registered under an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &["img", "input", "br"];

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    body: NodeId,
    blobs: HashMap<String, Blob>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only an empty `body`.
    pub fn new() -> Self {
        let body = Node::new(NodeKind::Element(ElementData {
            tag: "body".to_string(),
            ..ElementData::default()
        }));
        Document {
            slots: vec![Slot {
                generation: 0,
                node: Some(body),
            }],
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            blobs: HashMap::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // -----------------------------------------------------------------------
    // Node creation
    // -----------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            ..ElementData::default()
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(kind);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    /// Number of arena slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Drop cached line counts of `id` and every ancestor.
    fn invalidate_rows(&self, id: NodeId) {
        let mut current = Some(id);
        while let Some(n) = current.and_then(|n| self.node(n)) {
            n.rows.set(None);
            current = n.parent;
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(e) => Some(e),
            NodeKind::Text(_) => None,
        }
    }

    /// `true` while the node has not been removed.
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// `true` when the node is reachable from `body`.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if n == self.body {
                return true;
            }
            current = self.node(n).and_then(|node| node.parent);
        }
        false
    }

    // -----------------------------------------------------------------------
    // Tree mutation
    // -----------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.exists(parent) || !self.exists(child) || parent == child {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.invalidate_rows(parent);
    }

    /// Insert `child` immediately before `reference`. Falls back to append when
    /// `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if !self.exists(parent) || !self.exists(child) || child == reference {
            return;
        }
        self.detach(child);
        let pos = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|c| *c == reference));
        match pos {
            Some(idx) => {
                if let Some(p) = self.node_mut(parent) {
                    p.children.insert(idx, child);
                }
                if let Some(c) = self.node_mut(child) {
                    c.parent = Some(parent);
                }
                self.invalidate_rows(parent);
            }
            None => self.append_child(parent, child),
        }
    }

    /// Unlink a node from its parent but keep it (and its subtree) alive.
    pub fn detach(&mut self, id: NodeId) {
        let parent = match self.node_mut(id) {
            Some(n) => n.parent.take(),
            None => return,
        };
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.retain(|c| *c != id);
        }
        if let Some(p) = parent {
            self.invalidate_rows(p);
        }
    }

    /// Detach and free a node together with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.body {
            return;
        }
        self.detach(id);
        self.free_subtree(id);
    }

    /// Free every child of `id`.
    pub fn remove_children(&mut self, id: NodeId) {
        let children = match self.node_mut(id) {
            Some(n) => std::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
            self.free_subtree(child);
        }
        self.invalidate_rows(id);
    }

    /// Release every slot of the subtree. Bumping the generation turns
    /// outstanding handles into misses once the slot is reused.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(n.index)
                .filter(|s| s.generation == n.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(n.index);
                stack.extend(node.children);
            }
        }
    }

    /// Replace all children with a single text node (or nothing when `text` is empty).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if !self.exists(id) {
            return;
        }
        if let Some(NodeKind::Text(t)) = self.node_mut(id).map(|n| &mut n.kind) {
            *t = text.to_string();
            self.invalidate_rows(id);
            return;
        }
        self.remove_children(id);
        if !text.is_empty() {
            let t = self.create_text(text);
            self.append_child(id, t);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Element children only, skipping text nodes.
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Concatenated text of every descendant text node, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.node(id) {
            match &node.kind {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::Element(_) => {
                    for c in &node.children {
                        self.collect_text(*c, out);
                    }
                }
            }
        }
    }

    /// Find a connected element by its `id`.
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.body).into_iter().find(|n| {
            self.element(*n)
                .and_then(|e| e.id.as_deref())
                .is_some_and(|id| id == element_id)
        })
    }

    /// All descendants of `id` in pre-order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.node(n) {
                out.push(n);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// First descendant element of `id` carrying `class`.
    pub fn find_by_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .skip(1)
            .find(|n| self.has_class(*n, class))
    }

    // -----------------------------------------------------------------------
    // Element properties
    // -----------------------------------------------------------------------

    pub fn set_id(&mut self, id: NodeId, element_id: &str) {
        if let Some(e) = self.element_mut(id) {
            e.id = Some(element_id.to_string());
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(e) = self.element_mut(id) {
            if !e.classes.iter().any(|c| c == class) {
                e.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(e) = self.element_mut(id) {
            e.classes.retain(|c| c != class);
        }
    }

    /// Flip `class` and return whether it is now present.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            self.has_class(id, class)
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(e) = self.element_mut(id) {
            e.attributes.remove(name);
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(e) = self.element_mut(id) {
            e.value = value.to_string();
        }
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.element(id).map(|e| e.value.as_str()).unwrap_or("")
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    /// Content height in rows: one row per text line of each child element.
    /// Line counts are cached per child, so only changed children are re-measured.
    pub fn scroll_height(&self, id: NodeId) -> usize {
        self.children(id).iter().map(|c| self.rows(*c)).sum()
    }

    fn rows(&self, id: NodeId) -> usize {
        let Some(node) = self.node(id) else {
            return 0;
        };
        if let Some(rows) = node.rows.get() {
            return rows;
        }
        let rows = self.text_content(id).lines().count().max(1);
        node.rows.set(Some(rows));
        rows
    }

    pub fn scroll_top(&self, id: NodeId) -> usize {
        self.element(id).map(|e| e.scroll_top).unwrap_or(0)
    }

    pub fn scroll_to_bottom(&mut self, id: NodeId) {
        let height = self.scroll_height(id);
        if let Some(e) = self.element_mut(id) {
            e.scroll_top = height;
        }
    }

    // -----------------------------------------------------------------------
    // Object URLs
    // -----------------------------------------------------------------------

    /// Register `bytes` and return a fresh `blob:` URL for them.
    pub fn create_object_url(&mut self, bytes: Vec<u8>, mime_type: &str) -> String {
        let url = format!("blob:{}", uuid::Uuid::new_v4());
        self.blobs.insert(
            url.clone(),
            Blob {
                mime_type: mime_type.to_string(),
                bytes,
            },
        );
        url
    }

    pub fn blob(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    pub fn revoke_object_url(&mut self, url: &str) {
        self.blobs.remove(url);
    }

    pub fn object_url_count(&self) -> usize {
        self.blobs.len()
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize the subtree rooted at `id` as HTML. Text and attribute values are escaped.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(t) => out.push_str(&escape_html(t)),
            NodeKind::Element(e) => {
                out.push('<');
                out.push_str(&e.tag);
                if let Some(element_id) = &e.id {
                    out.push_str(&format!(" id=\"{}\"", escape_html(element_id)));
                }
                if !e.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", escape_html(&e.classes.join(" "))));
                }
                for (name, value) in &e.attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
                }
                out.push('>');
                if VOID_TAGS.contains(&e.tag.as_str()) {
                    return;
                }
                for c in &node.children {
                    self.write_html(*c, out);
                }
                out.push_str(&format!("</{}>", e.tag));
            }
        }
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
