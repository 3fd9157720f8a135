//! PDF parser.

use anyhow::{Context, Result};

use crate::doctree::{DocNode, DocTree};

use super::{title_from_filename, Parser};

/// Extracts whole-document text with pdf-extract and splits it into
/// `Page N` nodes on form feeds.
pub struct PdfParser;

impl Parser for PdfParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let text = pdf_extract::extract_text_from_mem(data).context("extract pdf text")?;

        let mut tree = DocTree {
            title: title_from_filename(filename),
            children: Vec::new(),
        };

        for (i, page) in text.split('\u{c}').enumerate() {
            let page = page.trim();
            if page.is_empty() {
                continue;
            }
            tree.children.push(DocNode {
                title: format!("Page {}", i + 1),
                text: page.to_string(),
                page: (i + 1) as u32,
                children: Vec::new(),
            });
        }

        if tree.children.is_empty() && !text.trim().is_empty() {
            tree.children.push(DocNode {
                text: text.trim().to_string(),
                page: 1,
                ..DocNode::default()
            });
        }

        Ok(tree)
    }
}
