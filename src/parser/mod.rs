//! Format parsers. Each parser turns raw document bytes into the common
//! [`DocTree`] shape; selection is by lower-cased file extension.

pub mod csv;
pub mod docx;
pub mod html;
pub mod markdown;
pub mod pdf;
pub mod text;

use std::path::Path;

use anyhow::{bail, Result};

use crate::doctree::{DocNode, DocTree};

/// Converts raw document bytes into a [`DocTree`].
pub trait Parser: Send + Sync {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree>;
}

/// Returns the parser for a filename, by extension.
pub fn for_file(filename: &str) -> Result<Box<dyn Parser>> {
    match extension(filename).as_str() {
        "txt" => Ok(Box::new(text::TextParser)),
        "md" | "markdown" => Ok(Box::new(markdown::MarkdownParser)),
        "csv" => Ok(Box::new(csv::CsvParser)),
        "html" | "htm" => Ok(Box::new(html::HtmlParser)),
        "pdf" => Ok(Box::new(pdf::PdfParser)),
        "docx" => Ok(Box::new(docx::DocxParser)),
        ext => bail!("unsupported file extension: .{ext}"),
    }
}

/// Whether this service can handle the file at all.
pub fn is_supported_extension(filename: &str) -> bool {
    matches!(
        extension(filename).as_str(),
        "txt" | "md" | "markdown" | "csv" | "html" | "htm" | "pdf" | "docx"
    )
}

fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Document title derived from the filename stem.
pub(crate) fn title_from_filename(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Builds nested sections from a flat stream of headings and paragraphs.
///
/// Shared by the markdown, HTML and DOCX parsers: headings open sections
/// at their level (popping anything at the same or deeper level first),
/// paragraph text accumulates on the innermost open section.
pub(crate) struct SectionBuilder {
    // (heading level, node); index 0 is the synthetic root at level 0.
    stack: Vec<(usize, DocNode)>,
}

impl SectionBuilder {
    pub(crate) fn new() -> Self {
        Self {
            stack: vec![(0, DocNode::default())],
        }
    }

    /// Appends one paragraph of text to the innermost open section.
    pub(crate) fn push_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let node = &mut self.stack.last_mut().expect("stack never empty").1;
        if node.text.is_empty() {
            node.text = text.to_string();
        } else {
            node.text.push_str("\n\n");
            node.text.push_str(text);
        }
    }

    /// Opens a new section at `level` (1-based heading depth).
    pub(crate) fn open_section(&mut self, level: usize, title: String) {
        while self.stack.len() > 1 && self.stack.last().expect("stack never empty").0 >= level {
            let (_, node) = self.stack.pop().expect("stack never empty");
            self.stack
                .last_mut()
                .expect("stack never empty")
                .1
                .children
                .push(node);
        }
        self.stack.push((level, DocNode::section(title)));
    }

    /// Closes all open sections and returns the tree children. A document
    /// with no headings at all yields its accumulated text as a single
    /// child node.
    pub(crate) fn finish(mut self) -> Vec<DocNode> {
        while self.stack.len() > 1 {
            let (_, node) = self.stack.pop().expect("stack never empty");
            self.stack
                .last_mut()
                .expect("stack never empty")
                .1
                .children
                .push(node);
        }
        let (_, root) = self.stack.pop().expect("stack never empty");
        if root.children.is_empty() && !root.text.is_empty() {
            vec![DocNode::text(root.text)]
        } else {
            root.children
        }
    }
}
