//! Markdown parser built on pulldown-cmark.

use anyhow::Result;
use pulldown_cmark::{Event, Parser as CmarkParser, Tag, TagEnd};

use crate::doctree::DocTree;

use super::{title_from_filename, Parser, SectionBuilder};

/// Builds a [`DocTree`] from Markdown headings: heading levels drive the
/// nesting, everything else accumulates as paragraph text on the innermost
/// open section.
pub struct MarkdownParser;

impl Parser for MarkdownParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let content = String::from_utf8_lossy(data);

        let mut builder = SectionBuilder::new();
        let mut heading: Option<String> = None;
        let mut paragraph = String::new();

        let flush_paragraph = |builder: &mut SectionBuilder, paragraph: &mut String| {
            if !paragraph.trim().is_empty() {
                builder.push_text(paragraph);
            }
            paragraph.clear();
        };

        for event in CmarkParser::new(&content) {
            match event {
                Event::Start(Tag::Heading { .. }) => {
                    flush_paragraph(&mut builder, &mut paragraph);
                    heading = Some(String::new());
                }
                Event::End(TagEnd::Heading(level)) => {
                    let title = heading.take().unwrap_or_default().trim().to_string();
                    builder.open_section(level as usize, title);
                }
                Event::Text(t) | Event::Code(t) => {
                    if let Some(h) = heading.as_mut() {
                        h.push_str(&t);
                    } else {
                        paragraph.push_str(&t);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(h) = heading.as_mut() {
                        h.push(' ');
                    } else {
                        paragraph.push('\n');
                    }
                }
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Item)
                | Event::End(TagEnd::CodeBlock) => {
                    flush_paragraph(&mut builder, &mut paragraph);
                }
                _ => {}
            }
        }
        flush_paragraph(&mut builder, &mut paragraph);

        Ok(DocTree {
            title: title_from_filename(filename),
            children: builder.finish(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_nesting() {
        let input = b"# Title\n\nIntro.\n\n## A\n\nBody A\n\n## B\n\nBody B\n";
        let tree = MarkdownParser.parse(input, "doc.md").unwrap();

        assert_eq!(tree.title, "doc");
        assert_eq!(tree.children.len(), 1);

        let h1 = &tree.children[0];
        assert_eq!(h1.title, "Title");
        assert_eq!(h1.text, "Intro.");
        assert_eq!(h1.children.len(), 2);
        assert_eq!(h1.children[0].title, "A");
        assert_eq!(h1.children[0].text, "Body A");
        assert_eq!(h1.children[1].title, "B");
        assert_eq!(h1.children[1].text, "Body B");
    }

    #[test]
    fn test_no_headings_yields_single_text_child() {
        let input = b"Just a paragraph.\n\nAnd another one.";
        let tree = MarkdownParser.parse(input, "plain.md").unwrap();

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text, "Just a paragraph.\n\nAnd another one.");
        assert!(tree.children[0].title.is_empty());
    }

    #[test]
    fn test_sibling_sections_after_deeper_nesting() {
        let input = b"# One\n\n### Deep\n\ndeep text\n\n# Two\n\nsecond";
        let tree = MarkdownParser.parse(input, "doc.md").unwrap();

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].title, "One");
        assert_eq!(tree.children[0].children[0].title, "Deep");
        assert_eq!(tree.children[1].title, "Two");
        assert_eq!(tree.children[1].text, "second");
    }

    #[test]
    fn test_list_items_collected_as_text() {
        let input = b"# L\n\n- first item\n- second item\n";
        let tree = MarkdownParser.parse(input, "list.md").unwrap();

        let section = &tree.children[0];
        assert!(section.text.contains("first item"));
        assert!(section.text.contains("second item"));
    }

    #[test]
    fn test_inline_code_kept() {
        let input = b"# T\n\nRun `cargo test` often.\n";
        let tree = MarkdownParser.parse(input, "code.md").unwrap();
        assert!(tree.children[0].text.contains("cargo test"));
    }

    #[test]
    fn test_empty_document() {
        let tree = MarkdownParser.parse(b"", "empty.md").unwrap();
        assert!(tree.children.is_empty());
    }
}
