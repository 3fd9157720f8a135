//! Common document tree model.
//!
//! Every format parser produces a [`DocTree`]; the chunker consumes it and
//! emits [`Chunk`]s carrying their structural context.

/// Root of a parsed document.
#[derive(Debug, Clone, Default)]
pub struct DocTree {
    /// Document title, from metadata or the filename stem.
    pub title: String,
    /// Top-level sections in document order.
    pub children: Vec<DocNode>,
}

/// A recursive section of a document.
///
/// Heading hierarchy is encoded by nesting depth; siblings preserve
/// document order.
#[derive(Debug, Clone, Default)]
pub struct DocNode {
    /// Section heading (empty for plain text nodes).
    pub title: String,
    /// Text content of this node (empty for pure container nodes).
    pub text: String,
    /// Source page, 0 when not applicable.
    pub page: u32,
    /// Subsections.
    pub children: Vec<DocNode>,
}

impl DocNode {
    /// A leaf node holding only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// A titled section node with no text of its own yet.
    pub fn section(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A sized text segment with structural context, ready for extraction.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk text content.
    pub text: String,
    /// 0-based sequence number within the document, assigned in DFS order.
    pub index: usize,
    /// Enclosing section titles, outermost first, root title omitted.
    pub breadcrumb: Vec<String>,
    pub page_start: u32,
    pub page_end: u32,
}
