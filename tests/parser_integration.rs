//! Parser-to-chunker integration: documents go in as bytes, chunks come
//! out with the right breadcrumbs.

use std::io::Write;

use docgest::chunker::{chunk_tree, ChunkConfig};
use docgest::parser;

fn small_chunks() -> ChunkConfig {
    ChunkConfig {
        chunk_size: 1500,
        chunk_overlap: 200,
        min_chunk: 1,
    }
}

#[test]
fn test_markdown_sections_become_breadcrumbed_chunks() {
    let input = b"# Title\n\nIntro.\n\n## A\n\nBody A\n\n## B\n\nBody B\n";
    let parser = parser::for_file("doc.md").unwrap();
    let tree = parser.parse(input, "doc.md").unwrap();

    // One h1 child with two h2 children.
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].children.len(), 2);

    let chunks = chunk_tree(&tree, small_chunks());
    assert!(chunks.len() >= 2);

    let breadcrumbs: Vec<&[String]> = chunks.iter().map(|c| c.breadcrumb.as_slice()).collect();
    assert!(breadcrumbs.contains(&["Title".to_string(), "A".to_string()].as_slice()));
    assert!(breadcrumbs.contains(&["Title".to_string(), "B".to_string()].as_slice()));

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
    }
}

#[test]
fn test_text_document_chunks_flat() {
    let input = b"First paragraph of the document.\n\nSecond paragraph of the document.";
    let parser = parser::for_file("notes.txt").unwrap();
    let tree = parser.parse(input, "notes.txt").unwrap();

    let chunks = chunk_tree(&tree, small_chunks());
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.breadcrumb.is_empty()));
}

#[test]
fn test_csv_rows_chunk_with_row_range_breadcrumb() {
    let input = b"name,beverage\nalice,tea\nbob,coffee\n";
    let parser = parser::for_file("prefs.csv").unwrap();
    let tree = parser.parse(input, "prefs.csv").unwrap();

    let chunks = chunk_tree(&tree, small_chunks());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].breadcrumb, vec!["Rows 2-3"]);
    assert!(chunks[0].text.contains("beverage: tea"));
}

#[test]
fn test_html_headings_drive_breadcrumbs() {
    let input = b"<html><head><title>Site</title></head><body>\
        <h1>Products</h1><h2>Widgets</h2><p>We sell widgets.</p>\
        </body></html>";
    let parser = parser::for_file("page.html").unwrap();
    let tree = parser.parse(input, "page.html").unwrap();

    assert_eq!(tree.title, "Site");
    let chunks = chunk_tree(&tree, small_chunks());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].breadcrumb, vec!["Products", "Widgets"]);
}

#[test]
fn test_docx_round_trip_through_registry() {
    let xml = r#"<?xml version="1.0"?><w:document><w:body>
        <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Overview</w:t></w:r></w:p>
        <w:p><w:r><w:t>The overview body text.</w:t></w:r></w:p>
        </w:body></w:document>"#;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let parser = parser::for_file("report.docx").unwrap();
    let tree = parser.parse(&bytes, "report.docx").unwrap();

    let chunks = chunk_tree(&tree, small_chunks());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].breadcrumb, vec!["Overview"]);
    assert_eq!(chunks[0].text, "The overview body text.");
}

#[test]
fn test_unsupported_extension_rejected_by_registry() {
    assert!(parser::for_file("archive.tar.gz").is_err());
    assert!(!parser::is_supported_extension("archive.tar.gz"));
}
