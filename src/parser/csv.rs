//! CSV parser.

use anyhow::{Context, Result};

use crate::doctree::{DocNode, DocTree};

use super::{title_from_filename, Parser};

/// Rows rendered per section node.
const BATCH_SIZE: usize = 20;

/// Renders CSV rows as `Header: value` text, grouped into batches so the
/// chunker gets manageable sections.
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(::csv::Trim::Fields)
            .from_reader(data);

        let mut records: Vec<::csv::StringRecord> = Vec::new();
        for record in reader.records() {
            records.push(record.context("parse csv")?);
        }

        let mut tree = DocTree {
            title: title_from_filename(filename),
            children: Vec::new(),
        };
        if records.is_empty() {
            return Ok(tree);
        }

        let headers: Vec<String> = records[0].iter().map(str::to_string).collect();
        let data_rows = &records[1..];

        for (batch_idx, batch) in data_rows.chunks(BATCH_SIZE).enumerate() {
            let start = batch_idx * BATCH_SIZE;
            let end = start + batch.len();

            let mut text = format!("Headers: {}\n\n", headers.join(", "));
            for row in batch {
                let rendered: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(j, cell)| match headers.get(j) {
                        Some(header) => format!("{header}: {cell}"),
                        None => cell.to_string(),
                    })
                    .collect();
                text.push_str(&rendered.join(", "));
                text.push('\n');
            }

            tree.children.push(DocNode {
                // 1-indexed source rows, skipping the header row.
                title: format!("Rows {}-{}", start + 2, end + 1),
                text,
                ..DocNode::default()
            });
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_rendered_with_headers() {
        let input = b"name,role\nalice,engineer\nbob,designer\n";
        let tree = CsvParser.parse(input, "team.csv").unwrap();

        assert_eq!(tree.title, "team");
        assert_eq!(tree.children.len(), 1);
        let node = &tree.children[0];
        assert_eq!(node.title, "Rows 2-3");
        assert!(node.text.starts_with("Headers: name, role\n\n"));
        assert!(node.text.contains("name: alice, role: engineer"));
        assert!(node.text.contains("name: bob, role: designer"));
    }

    #[test]
    fn test_batching_at_twenty_rows() {
        let mut input = String::from("id\n");
        for i in 0..45 {
            input.push_str(&format!("{i}\n"));
        }
        let tree = CsvParser.parse(input.as_bytes(), "nums.csv").unwrap();

        assert_eq!(tree.children.len(), 3);
        assert_eq!(tree.children[0].title, "Rows 2-21");
        assert_eq!(tree.children[1].title, "Rows 22-41");
        assert_eq!(tree.children[2].title, "Rows 42-46");
    }

    #[test]
    fn test_extra_cells_without_header() {
        let input = b"a,b\n1,2,3\n";
        let tree = CsvParser.parse(input, "x.csv").unwrap();
        assert!(tree.children[0].text.contains("a: 1, b: 2, 3"));
    }

    #[test]
    fn test_empty_csv() {
        let tree = CsvParser.parse(b"", "empty.csv").unwrap();
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_header_only_csv() {
        let tree = CsvParser.parse(b"a,b,c\n", "h.csv").unwrap();
        assert!(tree.children.is_empty());
    }
}
