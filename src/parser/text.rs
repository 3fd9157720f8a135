//! Plain text parser.

use anyhow::Result;

use crate::doctree::{DocNode, DocTree};

use super::{title_from_filename, Parser};

/// Splits plain text into blank-line-delimited paragraphs; each paragraph
/// becomes a flat child node.
pub struct TextParser;

impl Parser for TextParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let content = String::from_utf8_lossy(data);

        let mut children = Vec::new();
        let mut current = String::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    children.push(DocNode::text(std::mem::take(&mut current)));
                }
            } else {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(line);
            }
        }
        if !current.is_empty() {
            children.push(DocNode::text(current));
        }

        Ok(DocTree {
            title: title_from_filename(filename),
            children,
        })
    }
}
