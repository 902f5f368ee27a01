//! Find a sentence inside a text tree.
//!
//! Search is depth-first in document order and matches within a single text
//! node only. A sentence whose text is split across nodes (part of it bold,
//! say) is not found; callers treat that as "skip this sentence".

use crate::tree::{NodeKind, TextTree};

/// A byte range within one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange<N> {
    /// The text node containing the match.
    pub node: N,
    /// Byte offset of the first matched character.
    pub start: usize,
    /// Byte offset one past the last matched character.
    pub end: usize,
}

/// Locate the first occurrence of `needle` under `root`.
///
/// Returns `None` for an empty needle or when no single text node contains
/// it.
pub fn locate<T: TextTree>(tree: &T, root: T::Node, needle: &str) -> Option<TextRange<T::Node>> {
    if needle.is_empty() {
        return None;
    }
    text_nodes(tree, root).into_iter().find_map(|node| {
        let text = tree.text(node)?;
        text.find(needle).map(|start| TextRange {
            node,
            start,
            end: start + needle.len(),
        })
    })
}

/// Text nodes under `root` in document order.
pub fn text_nodes<T: TextTree>(tree: &T, root: T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match tree.kind(node) {
            NodeKind::Text => out.push(node),
            NodeKind::Element => stack.extend(tree.children(node).iter().rev()),
        }
    }
    out
}
