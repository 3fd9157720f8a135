//! DOCX parser: reads `word/document.xml` out of the OOXML archive and
//! walks its paragraphs.

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::doctree::DocTree;

use super::{title_from_filename, Parser, SectionBuilder};

/// Decompressed size bound for the document part (zip-bomb protection).
const MAX_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Builds a [`DocTree`] from DOCX paragraphs; `Heading1`–`Heading6` styles
/// open sections, everything else accumulates as text.
pub struct DocxParser;

impl Parser for DocxParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).context("open docx archive")?;

        let mut xml = Vec::new();
        {
            let entry = archive
                .by_name("word/document.xml")
                .context("word/document.xml not found")?;
            entry
                .take(MAX_XML_BYTES)
                .read_to_end(&mut xml)
                .context("read word/document.xml")?;
            if xml.len() as u64 >= MAX_XML_BYTES {
                bail!("word/document.xml exceeds size limit");
            }
        }

        let mut builder = SectionBuilder::new();
        // Text is read only directly inside <w:t>, where whitespace is
        // significant, so no trimming at the reader level.
        let mut reader = Reader::from_reader(xml.as_slice());

        let mut buf = Vec::new();
        let mut text_buf = Vec::new();
        let mut paragraph = String::new();
        let mut style: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"w:p" => {
                        paragraph.clear();
                        style = None;
                    }
                    b"w:pStyle" => style = style_value(&e),
                    b"w:t" => {
                        text_buf.clear();
                        if let Ok(Event::Text(t)) = reader.read_event_into(&mut text_buf) {
                            paragraph.push_str(&t.unescape().unwrap_or_default());
                        }
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"w:pStyle" => {
                    style = style_value(&e);
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                    let text = paragraph.trim().to_string();
                    if !text.is_empty() {
                        match style.as_deref().and_then(heading_level) {
                            Some(level) => builder.open_section(level, text),
                            None => builder.push_text(&text),
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => bail!("parse docx xml: {e}"),
                _ => {}
            }
            buf.clear();
        }

        Ok(DocTree {
            title: title_from_filename(filename),
            children: builder.finish(),
        })
    }
}

fn style_value(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"w:val")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Maps `Heading1`/`heading 1` style names to their level.
fn heading_level(style: &str) -> Option<usize> {
    let normalized: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "heading1" => Some(1),
        "heading2" => Some(2),
        "heading3" => Some(3),
        "heading4" => Some(4),
        "heading5" => Some(5),
        "heading6" => Some(6),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn para(style: Option<&str>, text: &str) -> String {
        let style_xml = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
            .unwrap_or_default();
        format!(r#"<w:p>{style_xml}<w:r><w:t>{text}</w:t></w:r></w:p>"#)
    }

    fn document(paragraphs: &[String]) -> String {
        format!(
            r#"<?xml version="1.0"?><w:document><w:body>{}</w:body></w:document>"#,
            paragraphs.join("")
        )
    }

    #[test]
    fn test_headings_build_nesting() {
        let xml = document(&[
            para(Some("Heading1"), "Chapter"),
            para(None, "Chapter intro."),
            para(Some("Heading2"), "Section"),
            para(None, "Section body."),
        ]);
        let tree = DocxParser.parse(&docx_bytes(&xml), "report.docx").unwrap();

        assert_eq!(tree.title, "report");
        assert_eq!(tree.children.len(), 1);
        let chapter = &tree.children[0];
        assert_eq!(chapter.title, "Chapter");
        assert_eq!(chapter.text, "Chapter intro.");
        assert_eq!(chapter.children[0].title, "Section");
        assert_eq!(chapter.children[0].text, "Section body.");
    }

    #[test]
    fn test_style_case_variants() {
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading 3"), Some(3));
        assert_eq!(heading_level("HEADING6"), Some(6));
        assert_eq!(heading_level("Normal"), None);
        assert_eq!(heading_level("Heading7"), None);
    }

    #[test]
    fn test_plain_paragraphs_only() {
        let xml = document(&[para(None, "First."), para(None, "Second.")]);
        let tree = DocxParser.parse(&docx_bytes(&xml), "plain.docx").unwrap();

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text, "First.\n\nSecond.");
    }

    #[test]
    fn test_multiple_runs_concatenate() {
        let xml = document(&[
            r#"<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world.</w:t></w:r></w:p>"#.to_string(),
        ]);
        let tree = DocxParser.parse(&docx_bytes(&xml), "runs.docx").unwrap();
        assert_eq!(tree.children[0].text, "Hello world.");
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        writer.start_file("other.xml", options).unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(DocxParser.parse(&bytes, "broken.docx").is_err());
    }

    #[test]
    fn test_not_a_zip() {
        assert!(DocxParser.parse(b"plain bytes", "x.docx").is_err());
    }
}
