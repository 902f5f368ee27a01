//! Editable surfaces: one interface over form fields, rich-text regions and
//! rendered documents.
//!
//! [`Surface::get_text`] reads the current plain text and
//! [`Surface::set_text`] replaces the first occurrence of an old string.
//! Replacement tries, in order:
//!
//! 1. a splice of the field value (form fields),
//! 2. a splice inside the single text node that contains the old text,
//! 3. a splice across a run of adjacent sibling text nodes, which are then
//!    merged into one.
//!
//! A rendered document is not editable itself. Its edits go to whichever
//! editable element has focus.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{SurfaceError, SurfaceResult};
use crate::locator::locate;
use crate::tree::{Document, HostEvent, NodeId, NodeKind, Rect, TextTree};

/// Class of the container a document editor renders into.
pub const RENDERED_CONTAINER_CLASS: &str = "kix-appview-editor";
/// Class of one rendered HTML line inside that container.
pub const RENDERED_LINE_CLASS: &str = "kix-lineview-content";
/// Attribute carrying the exact text of a vector-rendered fragment.
pub const FRAGMENT_LABEL_ATTR: &str = "aria-label";

/// Which kind of surface a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceKind {
    /// `textarea` or text `input`: a flat value.
    FormField,
    /// A `contenteditable` element: a tree of text nodes.
    RichText,
    /// A read-only rendering of a document editor.
    RenderedDocument,
}

impl SurfaceKind {
    /// Classify `node`, or `None` if it is not a surface.
    pub fn classify(doc: &Document, node: NodeId) -> Option<Self> {
        if doc.kind(node) != NodeKind::Element {
            return None;
        }
        if doc.has_class(node, RENDERED_CONTAINER_CLASS) {
            return Some(Self::RenderedDocument);
        }
        match doc.tag(node)? {
            "textarea" => return Some(Self::FormField),
            "input" => {
                let ty = doc.attr(node, "type").unwrap_or("text").to_ascii_lowercase();
                return matches!(ty.as_str(), "" | "text" | "search").then_some(Self::FormField);
            }
            _ => {}
        }
        matches!(doc.attr(node, "contenteditable"), Some("" | "true")).then_some(Self::RichText)
    }

    /// Whether this kind accepts edits directly.
    pub const fn is_editable(&self) -> bool {
        !matches!(self, Self::RenderedDocument)
    }
}

/// Whether `node` is an element the user can type into.
pub fn is_editable(doc: &Document, node: NodeId) -> bool {
    SurfaceKind::classify(doc, node).is_some_and(|k| k.is_editable())
}

/// How a replacement was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Spliced the form field's value.
    ValueSplice,
    /// Spliced a single text node.
    TextNode,
    /// Spliced across adjacent text nodes and merged them. The last
    /// resort, for text that markup split into sibling nodes.
    MergedRun,
}

/// A vector-rendered text fragment with its exact text and bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// The fragment element.
    pub node: NodeId,
    /// Its label text.
    pub text: String,
    /// Viewport bounds.
    pub bounds: Rect,
}

/// An editable region of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    kind: SurfaceKind,
    node: NodeId,
}

impl Surface {
    /// Wrap `node` as a surface of the given kind.
    pub const fn new(kind: SurfaceKind, node: NodeId) -> Self {
        Self { kind, node }
    }

    /// Wrap `node` if it is a surface.
    pub fn detect(doc: &Document, node: NodeId) -> Option<Self> {
        SurfaceKind::classify(doc, node).map(|kind| Self::new(kind, node))
    }

    /// Kind of surface.
    pub const fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// Underlying node.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Current plain text.
    pub fn get_text(&self, doc: &Document) -> String {
        match self.kind {
            SurfaceKind::FormField => doc.value(self.node).unwrap_or_default().to_string(),
            SurfaceKind::RichText => doc.inner_text(self.node),
            SurfaceKind::RenderedDocument => {
                let fragments = self.fragments(doc);
                if !fragments.is_empty() {
                    return fragments
                        .into_iter()
                        .map(|f| f.text)
                        .collect::<Vec<_>>()
                        .join("\n");
                }
                let lines = self.lines(doc);
                if lines.is_empty() {
                    return doc.inner_text(self.node);
                }
                lines
                    .into_iter()
                    .map(|l| doc.text_content(l))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }

    /// Labelled vector fragments of a rendered document, in document order.
    /// Empty for other kinds, or when the vector layer is not present.
    pub fn fragments(&self, doc: &Document) -> Vec<Fragment> {
        if self.kind != SurfaceKind::RenderedDocument {
            return Vec::new();
        }
        doc.descendants(self.node)
            .into_iter()
            .filter_map(|node| {
                let text = doc.attr(node, FRAGMENT_LABEL_ATTR)?.trim();
                if text.is_empty() {
                    return None;
                }
                let bounds = doc.bounding_rect(node)?;
                Some(Fragment {
                    node,
                    text: text.to_string(),
                    bounds,
                })
            })
            .collect()
    }

    /// HTML line elements of a rendered document, in document order.
    pub fn lines(&self, doc: &Document) -> Vec<NodeId> {
        if self.kind != SurfaceKind::RenderedDocument {
            return Vec::new();
        }
        doc.descendants(self.node)
            .into_iter()
            .filter(|&n| doc.has_class(n, RENDERED_LINE_CLASS))
            .collect()
    }

    /// Replace the first occurrence of `old` with `new`.
    ///
    /// On success the host is notified with an input event (and a change
    /// event for form fields) on the edited element.
    #[tracing::instrument(skip_all, fields(kind = ?self.kind, old_len = old.len()))]
    pub fn set_text(&self, doc: &mut Document, old: &str, new: &str) -> SurfaceResult<ReplaceStrategy> {
        if old.is_empty() || new.is_empty() {
            return Err(SurfaceError::EmptyReplacement);
        }
        match self.kind {
            SurfaceKind::FormField => {
                let value = doc.value(self.node).unwrap_or_default();
                let Some(pos) = value.find(old) else {
                    return Err(SurfaceError::TextNotFound(old.to_string()));
                };
                let mut spliced = String::with_capacity(value.len() + new.len());
                spliced.push_str(&value[..pos]);
                spliced.push_str(new);
                spliced.push_str(&value[pos + old.len()..]);
                doc.set_value(self.node, &spliced);
                doc.dispatch(self.node, HostEvent::Input);
                doc.dispatch(self.node, HostEvent::Change);
                Ok(ReplaceStrategy::ValueSplice)
            }
            SurfaceKind::RichText => {
                let strategy = replace_in_tree(doc, self.node, old, new)?;
                doc.dispatch(self.node, HostEvent::Input);
                Ok(strategy)
            }
            SurfaceKind::RenderedDocument => {
                let target = doc
                    .active_element()
                    .and_then(|n| Self::detect(doc, n))
                    .filter(|s| s.kind.is_editable())
                    .ok_or(SurfaceError::NoFocusedEditor)?;
                tracing::debug!(node = ?target.node, "routing edit to focused editor");
                target.set_text(doc, old, new)
            }
        }
    }
}

fn replace_in_tree(
    doc: &mut Document,
    root: NodeId,
    old: &str,
    new: &str,
) -> SurfaceResult<ReplaceStrategy> {
    if let Some(range) = locate(doc, root, old) {
        let text = doc.text(range.node).unwrap_or_default();
        let spliced = format!("{}{new}{}", &text[..range.start], &text[range.end..]);
        doc.set_text(range.node, &spliced);
        return Ok(ReplaceStrategy::TextNode);
    }

    for element in doc.descendants(root) {
        for run in text_runs(doc, element) {
            let joined: String = run.iter().filter_map(|&n| doc.text(n)).collect();
            if let Some(pos) = joined.find(old) {
                let spliced = format!("{}{new}{}", &joined[..pos], &joined[pos + old.len()..]);
                doc.set_text(run[0], &spliced);
                for &extra in &run[1..] {
                    doc.remove(extra);
                }
                tracing::debug!(merged = run.len(), "replaced across adjacent text nodes");
                return Ok(ReplaceStrategy::MergedRun);
            }
        }
    }

    tracing::debug!("no text node or run contains the old text");
    Err(SurfaceError::TextNotFound(old.to_string()))
}

/// Maximal runs (two or more) of adjacent text-node children of `element`.
fn text_runs(doc: &Document, element: NodeId) -> Vec<Vec<NodeId>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &child in doc.children(element) {
        if doc.kind(child) == NodeKind::Text {
            current.push(child);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    runs.push(current);
    runs.retain(|r| r.len() > 1);
    runs
}
