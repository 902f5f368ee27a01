//! Markdown and plain text as analysis input.
//!
//! Two views of the same input:
//!
//! - [`strip_to_prose`] flattens markdown to scoreable prose, with
//!   paragraph breaks kept so the segmenter treats them as boundaries.
//! - [`rich_text_from_markdown`] and [`rich_text_from_plain`] build a
//!   [`Document`] holding one rich-text editor, so the whole
//!   discover/segment/locate/draw pipeline can run over a file.
//! - [`form_field_from_text`] wraps raw text in a `textarea`, for edits
//!   that must leave every other byte of the input alone.
//!
//! Uses pulldown-cmark for CommonMark parsing rather than regex stripping.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::text::split_paragraphs;
use crate::tree::{Document, LayoutMetrics, NodeId, NodeKind, TextTree};

/// How input text is marked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// CommonMark.
    Markdown,
    /// Paragraphs separated by blank lines.
    #[default]
    Plain,
}

impl InputFormat {
    /// Format implied by a file extension.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("md" | "markdown") => Self::Markdown,
            _ => Self::Plain,
        }
    }
}

/// Build a single-editor document from `text` in the given format.
pub fn rich_text(text: &str, format: InputFormat, metrics: LayoutMetrics) -> (Document, NodeId) {
    match format {
        InputFormat::Markdown => rich_text_from_markdown(text, metrics),
        InputFormat::Plain => rich_text_from_plain(text, metrics),
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
}

/// Strip markdown formatting, returning plain prose text.
///
/// Code blocks, inline code, HTML, YAML frontmatter and headings are
/// removed. Link text, blockquotes, list items and emphasised text are
/// kept without their markers. Paragraphs are separated by blank lines,
/// list items by line breaks.
#[tracing::instrument(skip_all, fields(input_len = text.len()))]
pub fn strip_to_prose(text: &str) -> String {
    let text = strip_frontmatter(text);
    let parser = Parser::new_ext(&text, parser_options());

    let mut result = String::with_capacity(text.len() / 2);
    let mut skip_depth: usize = 0;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_) | Tag::Heading { .. }) => {
                skip_depth += 1;
            }
            Event::End(TagEnd::CodeBlock | TagEnd::Heading(_)) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(t) if skip_depth == 0 => {
                result.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak if skip_depth == 0 => {
                result.push(' ');
            }
            Event::End(TagEnd::Paragraph) if skip_depth == 0 => {
                result.push_str("\n\n");
            }
            Event::End(TagEnd::Item) if skip_depth == 0 && !result.ends_with('\n') => {
                result.push('\n');
            }
            _ => {}
        }
    }

    result.trim_end().to_string()
}

/// Build a document whose body holds one rich-text editor populated from
/// markdown. Returns the document and the editor element.
///
/// Block structure maps to block elements (`p`, `h1`..`h6`, `li`,
/// `blockquote`), emphasis and links to inline elements, so a sentence with
/// a bold word in it spans several text nodes, as it would in a browser.
/// Code blocks, tables, images and raw HTML are left out.
#[tracing::instrument(skip_all, fields(input_len = text.len()))]
pub fn rich_text_from_markdown(text: &str, metrics: LayoutMetrics) -> (Document, NodeId) {
    let (mut doc, editor) = empty_editor(metrics);
    let text = strip_frontmatter(text);

    // `None` frames are skipped subtrees.
    let mut frames: Vec<Option<NodeId>> = vec![Some(editor)];

    for event in Parser::new_ext(&text, parser_options()) {
        let skipping = frames.iter().any(Option::is_none);
        let parent = frames.last().copied().flatten().unwrap_or(editor);
        match event {
            Event::Start(tag) => {
                let frame = match element_for(&tag) {
                    Some(name) if !skipping => Some(doc.append_element(parent, &name)),
                    _ => None,
                };
                frames.push(frame);
            }
            Event::End(_) => {
                if frames.len() > 1 {
                    frames.pop();
                }
            }
            Event::Text(t) if !skipping => append_merged_text(&mut doc, parent, &t),
            Event::SoftBreak if !skipping => append_merged_text(&mut doc, parent, " "),
            Event::HardBreak if !skipping => {
                doc.append_element(parent, "br");
            }
            Event::Code(t) if !skipping => {
                let code = doc.append_element(parent, "code");
                doc.append_text(code, &t);
            }
            _ => {}
        }
    }

    (doc, editor)
}

/// Build a rich-text editor from plain text, one paragraph per blank-line
/// separated block.
pub fn rich_text_from_plain(text: &str, metrics: LayoutMetrics) -> (Document, NodeId) {
    let (mut doc, editor) = empty_editor(metrics);
    for paragraph in split_paragraphs(text) {
        let p = doc.append_element(editor, "p");
        doc.append_text(p, &paragraph);
    }
    (doc, editor)
}

/// Build a document holding one `textarea` whose value is `text`,
/// focused so edits route straight to it.
pub fn form_field_from_text(text: &str, metrics: LayoutMetrics) -> (Document, NodeId) {
    let mut doc = Document::with_metrics(metrics);
    let root = doc.root();
    let field = doc.append_element(root, "textarea");
    doc.set_value(field, text);
    doc.focus(field);
    (doc, field)
}

fn empty_editor(metrics: LayoutMetrics) -> (Document, NodeId) {
    let mut doc = Document::with_metrics(metrics);
    let root = doc.root();
    let editor = doc.append_element(root, "div");
    doc.set_attr(editor, "contenteditable", "true");
    (doc, editor)
}

/// Element name for a markdown tag, or `None` for content that is not prose.
fn element_for(tag: &Tag<'_>) -> Option<String> {
    let name = match tag {
        Tag::Paragraph => "p",
        Tag::Heading { level, .. } => return Some(format!("h{}", *level as u8)),
        Tag::BlockQuote(_) => "blockquote",
        Tag::List(Some(_)) => "ol",
        Tag::List(None) => "ul",
        Tag::Item => "li",
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "s",
        Tag::Link { .. } => "a",
        _ => return None,
    };
    Some(name.to_string())
}

/// Append text to `parent`, extending its last child if that is already a
/// text node (the parser splits text around entities).
fn append_merged_text(doc: &mut Document, parent: NodeId, text: &str) {
    if let Some(&last) = doc.children(parent).last()
        && doc.kind(last) == NodeKind::Text
    {
        let merged = format!("{}{text}", doc.text(last).unwrap_or_default());
        doc.set_text(last, &merged);
        return;
    }
    doc.append_text(parent, text);
}

/// Strip YAML frontmatter delimited by `---` lines.
fn strip_frontmatter(text: &str) -> String {
    let trimmed = text.trim_start();
    if !trimmed.starts_with("---") {
        return text.to_string();
    }

    let after_opening = &trimmed[3..];
    let Some(close_pos) = after_opening.find("\n---") else {
        return text.to_string();
    };

    let remainder = &after_opening[close_pos + 4..];
    remainder
        .strip_prefix('\n')
        .unwrap_or(remainder)
        .to_string()
}
