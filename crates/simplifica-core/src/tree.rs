//! DOM-like document tree.
//!
//! The analysis pipeline never talks to a rendering engine directly. It sees
//! a tree through two traits:
//!
//! - [`TextTree`] exposes node kind, children and text content, which is
//!   all the locator needs for its depth-first search.
//! - [`Layout`] adds geometry: client rectangles for a text range and the
//!   current scroll offset.
//!
//! [`Document`] is the in-memory implementation. Its layout model is a
//! deterministic fixed-cell flow: every character occupies one cell, lines
//! wrap at a fixed column, and block elements start on a fresh line. That is
//! enough to exercise wrapping (one sentence, several rectangles) and scroll
//! compensation without a browser.

use std::collections::BTreeMap;
use std::ops::Range;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// The same rectangle moved by `offset`.
    pub fn translate(&self, offset: Point) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Whether `p` lies inside (edges inclusive).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }
}

/// Whether a node carries children or text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag, attributes and children.
    Element,
    /// A leaf holding text.
    Text,
}

/// Read access to a tree of elements and text nodes.
pub trait TextTree {
    /// Node handle.
    type Node: Copy + Eq + std::fmt::Debug;

    /// Kind of `node`.
    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Children of `node` in document order. Text nodes have none.
    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// Text of a text node; `None` for elements.
    fn text(&self, node: Self::Node) -> Option<&str>;
}

/// Geometry queries over a [`TextTree`].
pub trait Layout: TextTree {
    /// Viewport-relative rectangles covering `range` (byte offsets) of a
    /// text node. A range that wraps yields one rectangle per visual line.
    fn client_rects(&self, node: Self::Node, range: Range<usize>) -> Vec<Rect>;

    /// Current scroll offset; add it to a client rectangle to get page
    /// coordinates.
    fn scroll_offset(&self) -> Point;
}

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Index of the node in its document's arena.
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Events a host page dispatches to, or observes on, a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostEvent {
    /// Text changed through editing.
    Input,
    /// A form field's value was committed.
    Change,
    /// A key was released.
    KeyUp,
    /// Content was pasted.
    Paste,
    /// A node received focus.
    FocusIn,
    /// Primary click.
    Click,
    /// Secondary click.
    ContextMenu,
    /// The page scrolled.
    Scroll,
    /// The viewport changed size.
    Resize,
}

/// Fixed-cell layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Top-left corner of the first line, in page coordinates.
    pub origin: Point,
    /// Width of one character cell.
    pub char_width: f64,
    /// Height of one line.
    pub line_height: f64,
    /// Cells per line before wrapping.
    pub wrap_columns: usize,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            origin: Point::new(8.0, 8.0),
            char_width: 8.0,
            line_height: 18.0,
            wrap_columns: 80,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    value: Option<String>,
    bounds: Option<Rect>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

const BLOCK_TAGS: &[&str] = &[
    "article",
    "blockquote",
    "body",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "ul",
];

/// In-memory document: an arena of nodes rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    metrics: LayoutMetrics,
    scroll: Point,
    focused: Option<NodeId>,
    events: Vec<(NodeId, HostEvent)>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document with default layout metrics.
    pub fn new() -> Self {
        Self::with_metrics(LayoutMetrics::default())
    }

    /// An empty document with the given layout metrics.
    pub fn with_metrics(metrics: LayoutMetrics) -> Self {
        let body = Node {
            data: NodeData::Element(Element {
                tag: "body".to_string(),
                attrs: BTreeMap::new(),
                value: None,
                bounds: None,
            }),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![body],
            root: NodeId(0),
            metrics,
            scroll: Point::default(),
            focused: None,
            events: Vec::new(),
        }
    }

    /// The `body` element.
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Layout parameters.
    pub const fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Append a new element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push(
            parent,
            NodeData::Element(Element {
                tag: tag.to_ascii_lowercase(),
                attrs: BTreeMap::new(),
                value: None,
                bounds: None,
            }),
        )
    }

    /// Append a new text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeData::Text(text.to_string()))
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Detach `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
        if self.focused.is_some_and(|f| self.contains(node, f)) {
            self.focused = None;
        }
    }

    /// Parent of `node`, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Whether `node` is still reachable from the root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    /// Lowercase tag name of an element.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    /// Attribute value of an element.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    /// Set an attribute on an element. Ignored for text nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(e) = self.element_mut(node) {
            e.attrs.insert(name.to_string(), value.to_string());
        }
    }

    /// Whether the element's `class` attribute lists `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Value of a form field.
    pub fn value(&self, node: NodeId) -> Option<&str> {
        self.element(node).and_then(|e| e.value.as_deref())
    }

    /// Set the value of a form field.
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(e) = self.element_mut(node) {
            e.value = Some(value.to_string());
        }
    }

    /// Give an element fixed, out-of-flow bounds in page coordinates (as a
    /// vector-rendered glyph run has).
    pub fn set_bounds(&mut self, node: NodeId, bounds: Rect) {
        if let Some(e) = self.element_mut(node) {
            e.bounds = Some(bounds);
        }
    }

    /// Replace the text of a text node. Ignored for elements.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeData::Text(t) = &mut self.nodes[node.0].data {
            text.clone_into(t);
        }
    }

    /// Whether `node` or any ancestor carries the `hidden` attribute.
    pub fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.attr(n, "hidden").is_some() {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    /// All nodes under `node` (inclusive) in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n.0].children.iter().rev());
        }
        out
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Rendered text of `node`: block elements and `br` become line breaks,
    /// hidden and out-of-flow subtrees are skipped.
    pub fn inner_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![(node, true)];
        while let Some((n, entering)) = stack.pop() {
            match &self.nodes[n.0].data {
                NodeData::Text(t) => out.push_str(t),
                NodeData::Element(e) => {
                    if entering && e.tag == "br" {
                        out.push('\n');
                        continue;
                    }
                    if entering && n != node && self.skips_flow(e) {
                        continue;
                    }
                    if BLOCK_TAGS.contains(&e.tag.as_str()) && !out.is_empty() && !out.ends_with('\n')
                    {
                        out.push('\n');
                    }
                    if entering {
                        stack.push((n, false));
                        stack.extend(self.nodes[n.0].children.iter().rev().map(|&c| (c, true)));
                    }
                }
            }
        }
        out.trim_end_matches('\n').to_string()
    }

    fn skips_flow(&self, e: &Element) -> bool {
        e.bounds.is_some()
            || e.attrs.contains_key("hidden")
            || matches!(e.tag.as_str(), "input" | "textarea" | "script" | "style")
    }

    /// Move focus to `node`.
    pub fn focus(&mut self, node: NodeId) {
        self.focused = Some(node);
    }

    /// Drop focus.
    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// The focused node, if still attached.
    pub fn active_element(&self) -> Option<NodeId> {
        self.focused.filter(|&f| self.is_connected(f))
    }

    /// Set the scroll offset.
    pub fn set_scroll(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    /// Record that `event` was dispatched on `node`.
    pub fn dispatch(&mut self, node: NodeId, event: HostEvent) {
        self.events.push((node, event));
    }

    /// Drain the record of dispatched events.
    pub fn take_events(&mut self) -> Vec<(NodeId, HostEvent)> {
        std::mem::take(&mut self.events)
    }

    /// Viewport-relative bounds of `node`: its fixed bounds if it has any,
    /// otherwise the union of its text's rectangles.
    pub fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if let Some(bounds) = self.element(node).and_then(|e| e.bounds) {
            return Some(bounds.translate(Point::new(-self.scroll.x, -self.scroll.y)));
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.text(n).map(|t| (n, t.len())))
            .flat_map(|(n, len)| self.client_rects(n, 0..len))
            .reduce(|a, b| a.union(&b))
    }

    /// Flow the document up to the start of `target`, returning the cursor
    /// there, or `None` when `target` is not laid out.
    fn cursor_at(&self, target: NodeId) -> Option<Cursor> {
        let mut cursor = Cursor::new(self.metrics.wrap_columns);
        let mut stack = vec![(self.root, true)];
        while let Some((n, entering)) = stack.pop() {
            match &self.nodes[n.0].data {
                NodeData::Text(t) => {
                    if n == target {
                        return Some(cursor);
                    }
                    t.chars().for_each(|c| {
                        cursor.advance(c);
                    });
                }
                NodeData::Element(e) => {
                    if entering && e.tag == "br" {
                        cursor.newline();
                        continue;
                    }
                    if entering && self.skips_flow(e) {
                        continue;
                    }
                    if BLOCK_TAGS.contains(&e.tag.as_str()) {
                        cursor.break_line();
                    }
                    if entering {
                        stack.push((n, false));
                        stack.extend(self.nodes[n.0].children.iter().rev().map(|&c| (c, true)));
                    }
                }
            }
        }
        None
    }
}

impl TextTree for Document {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.nodes[node.0].data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        }
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }
}

impl Layout for Document {
    fn client_rects(&self, node: NodeId, range: Range<usize>) -> Vec<Rect> {
        let Some(text) = self.text(node) else {
            return Vec::new();
        };
        if range.start >= range.end || range.end > text.len() {
            return Vec::new();
        }
        let Some(mut cursor) = self.cursor_at(node) else {
            return Vec::new();
        };

        let mut rects: Vec<Rect> = Vec::new();
        // (line, first column, cells) of the line segment being accumulated.
        let mut run: Option<(usize, usize, usize)> = None;

        for (pos, ch) in text.char_indices() {
            let placed = cursor.advance(ch);
            if !range.contains(&pos) {
                continue;
            }
            let Some((col, line)) = placed else {
                if let Some((l, f, c)) = run.take() {
                    rects.push(self.cell_rect(l, f, c));
                }
                continue;
            };
            if run.is_some_and(|(l, f, c)| l == line && col == f + c) {
                if let Some(r) = run.as_mut() {
                    r.2 += 1;
                }
            } else if let Some((l, f, c)) = run.replace((line, col, 1)) {
                rects.push(self.cell_rect(l, f, c));
            }
        }
        if let Some((l, f, c)) = run {
            rects.push(self.cell_rect(l, f, c));
        }
        tracing::trace!(?node, rects = rects.len(), "laid out range");
        rects
    }

    fn scroll_offset(&self) -> Point {
        self.scroll
    }
}

impl Document {
    fn cell_rect(&self, line: usize, col: usize, cells: usize) -> Rect {
        let m = &self.metrics;
        Rect::new(
            m.char_width.mul_add(col as f64, m.origin.x) - self.scroll.x,
            m.line_height.mul_add(line as f64, m.origin.y) - self.scroll.y,
            m.char_width * cells as f64,
            m.line_height,
        )
    }
}

/// Position in the fixed-cell flow.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    col: usize,
    line: usize,
    wrap: usize,
}

impl Cursor {
    const fn new(wrap: usize) -> Self {
        Self {
            col: 0,
            line: 0,
            wrap: if wrap == 0 { 1 } else { wrap },
        }
    }

    /// Place `ch`, returning its `(col, line)` cell, or `None` for a line break.
    fn advance(&mut self, ch: char) -> Option<(usize, usize)> {
        if ch == '\n' {
            self.newline();
            return None;
        }
        if self.col == self.wrap {
            self.newline();
        }
        let cell = (self.col, self.line);
        self.col += 1;
        Some(cell)
    }

    const fn newline(&mut self) {
        self.line += 1;
        self.col = 0;
    }

    /// Start a new line unless already at the start of one.
    const fn break_line(&mut self) {
        if self.col > 0 {
            self.newline();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(texts: &[&str]) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let nodes = texts
            .iter()
            .map(|t| {
                let p = doc.append_element(root, "p");
                doc.append_text(p, t)
            })
            .collect();
        (doc, nodes)
    }

    #[test]
    fn inner_text_separates_blocks() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_element(root, "div");
        let p1 = doc.append_element(div, "p");
        doc.append_text(p1, "Um.");
        let p2 = doc.append_element(div, "p");
        doc.append_text(p2, "Dois ");
        let b = doc.append_element(p2, "b");
        doc.append_text(b, "negrito");
        doc.append_text(p2, ".");
        assert_eq!(doc.inner_text(div), "Um.\nDois negrito.");
        assert_eq!(doc.text_content(div), "Um.Dois negrito.");
    }

    #[test]
    fn inner_text_skips_hidden_and_fields() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = doc.append_element(root, "p");
        doc.append_text(p, "Visível");
        let hidden = doc.append_element(root, "p");
        doc.set_attr(hidden, "hidden", "");
        doc.append_text(hidden, "Oculto");
        let field = doc.append_element(root, "textarea");
        doc.set_value(field, "valor");
        assert_eq!(doc.inner_text(root), "Visível");
    }

    #[test]
    fn rects_follow_fixed_cells() {
        let (doc, nodes) = paragraphs(&["Olá mundo", "Segunda linha"]);
        let rects = doc.client_rects(nodes[1], 0.."Segunda".len());
        assert_eq!(rects, vec![Rect::new(8.0, 26.0, 56.0, 18.0)]);
    }

    #[test]
    fn wrapped_range_yields_rect_per_line() {
        let metrics = LayoutMetrics {
            wrap_columns: 10,
            ..LayoutMetrics::default()
        };
        let mut doc = Document::with_metrics(metrics);
        let root = doc.root();
        let p = doc.append_element(root, "p");
        let t = doc.append_text(p, "abcdefghijklmnopqrstuvwxy");
        let rects = doc.client_rects(t, 5..25);
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[0], Rect::new(48.0, 8.0, 40.0, 18.0));
        assert_eq!(rects[1], Rect::new(8.0, 26.0, 80.0, 18.0));
        assert_eq!(rects[2], Rect::new(8.0, 44.0, 40.0, 18.0));
    }

    #[test]
    fn scroll_shifts_client_rects() {
        let (mut doc, nodes) = paragraphs(&["Texto"]);
        doc.set_scroll(Point::new(0.0, 100.0));
        let rects = doc.client_rects(nodes[0], 0..5);
        assert_eq!(rects[0].y, 8.0 - 100.0);
        assert_eq!(doc.scroll_offset(), Point::new(0.0, 100.0));
    }

    #[test]
    fn detached_nodes_have_no_rects() {
        let (mut doc, nodes) = paragraphs(&["Texto"]);
        let p = doc.parent(nodes[0]).unwrap();
        doc.remove(p);
        assert!(!doc.is_connected(nodes[0]));
        assert!(doc.client_rects(nodes[0], 0..5).is_empty());
    }

    #[test]
    fn fixed_bounds_override_flow() {
        let mut doc = Document::new();
        let root = doc.root();
        let rect = doc.append_element(root, "rect");
        doc.set_bounds(rect, Rect::new(100.0, 200.0, 300.0, 20.0));
        doc.set_scroll(Point::new(0.0, 50.0));
        assert_eq!(
            doc.bounding_rect(rect),
            Some(Rect::new(100.0, 150.0, 300.0, 20.0))
        );
    }

    #[test]
    fn focus_is_dropped_with_removed_subtree() {
        let (mut doc, nodes) = paragraphs(&["Texto"]);
        let p = doc.parent(nodes[0]).unwrap();
        doc.focus(p);
        assert_eq!(doc.active_element(), Some(p));
        doc.remove(p);
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn rect_helpers() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(5.0, 10.0)));
        assert!(!r.contains(Point::new(11.0, 5.0)));
        let u = r.union(&Rect::new(20.0, 5.0, 5.0, 10.0));
        assert_eq!(u, Rect::new(0.0, 0.0, 25.0, 15.0));
    }
}
