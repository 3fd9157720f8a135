//! Structure-aware document chunking.
//!
//! Walks a [`DocTree`] in pre-order and emits sized [`Chunk`]s that carry a
//! breadcrumb of enclosing headings. Oversized node text is split by
//! paragraphs, then by sentences, with a tail overlap so consecutive chunks
//! share context.

pub mod token;

pub use token::estimate_tokens;

use crate::doctree::{Chunk, DocNode, DocTree};

/// Controls chunking behavior.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens.
    pub chunk_overlap: usize,
    /// Minimum chunk size to emit.
    pub min_chunk: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            min_chunk: 100,
        }
    }
}

impl ChunkConfig {
    /// Replaces zero-valued fields with defaults.
    fn normalized(mut self) -> Self {
        let d = Self::default();
        if self.chunk_size == 0 {
            self.chunk_size = d.chunk_size;
        }
        if self.chunk_overlap == 0 {
            self.chunk_overlap = d.chunk_overlap;
        }
        if self.min_chunk == 0 {
            self.min_chunk = d.min_chunk;
        }
        self
    }
}

/// Walks a [`DocTree`] and produces structure-aware chunks.
///
/// Chunk indices are assigned in DFS order across the whole tree with no
/// gaps. Each chunk carries its own copy of the breadcrumb at emission
/// time, so sibling subtrees never see each other's headings.
pub fn chunk_tree(tree: &DocTree, cfg: ChunkConfig) -> Vec<Chunk> {
    let cfg = cfg.normalized();
    let mut chunks = Vec::new();
    for child in &tree.children {
        walk_node(child, &[], cfg, &mut chunks);
    }
    chunks
}

fn walk_node(node: &DocNode, breadcrumb: &[String], cfg: ChunkConfig, chunks: &mut Vec<Chunk>) {
    let mut bc = breadcrumb.to_vec();
    if !node.title.is_empty() {
        bc.push(node.title.clone());
    }

    if !node.text.is_empty() {
        let tokens = estimate_tokens(&node.text);
        if tokens <= cfg.chunk_size {
            if tokens >= cfg.min_chunk {
                chunks.push(Chunk {
                    text: node.text.clone(),
                    index: chunks.len(),
                    breadcrumb: bc.clone(),
                    page_start: node.page,
                    page_end: node.page,
                });
            }
        } else {
            for part in split_text(&node.text, cfg.chunk_size, cfg.chunk_overlap) {
                if estimate_tokens(&part) >= cfg.min_chunk {
                    chunks.push(Chunk {
                        text: part,
                        index: chunks.len(),
                        breadcrumb: bc.clone(),
                        page_start: node.page,
                        page_end: node.page,
                    });
                }
            }
        }
    }

    for child in &node.children {
        walk_node(child, &bc, cfg, chunks);
    }
}

/// Breaks text into pieces of approximately `target_tokens`, greedily
/// accumulating blank-line-delimited paragraphs with a tail overlap.
fn split_text(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let paragraphs = split_by_paragraphs(text);

    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for para in paragraphs {
        let para_tokens = estimate_tokens(para);

        // A single paragraph larger than the target gets split one level
        // further, by sentences.
        if para_tokens > target_tokens {
            if current_tokens > 0 {
                result.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            result.extend(split_by_sentences(para, target_tokens, overlap_tokens));
            continue;
        }

        if current_tokens + para_tokens > target_tokens && current_tokens > 0 {
            let overlap = overlap_text(&current, overlap_tokens);
            result.push(std::mem::take(&mut current));
            current_tokens = 0;
            if !overlap.is_empty() {
                current_tokens = estimate_tokens(&overlap);
                current = overlap;
            }
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
        current_tokens += para_tokens;
    }

    if current_tokens > 0 {
        result.push(current);
    }

    result
}

fn split_by_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Sentence-level fallback for paragraphs that exceed the target on their
/// own. Same greedy accumulation as the paragraph pass, glued with single
/// spaces.
fn split_by_sentences(text: &str, target_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    let sentences = split_sentences(text);

    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for sent in sentences {
        let sent_tokens = estimate_tokens(&sent);

        if current_tokens + sent_tokens > target_tokens && current_tokens > 0 {
            let overlap = overlap_text(&current, overlap_tokens);
            result.push(std::mem::take(&mut current));
            current_tokens = 0;
            if !overlap.is_empty() {
                current_tokens = estimate_tokens(&overlap);
                current = overlap;
            }
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&sent);
        current_tokens += sent_tokens;
    }

    if current_tokens > 0 {
        result.push(current);
    }

    result
}

/// Splits on '.', '!' or '?' followed by a space.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut iter = text.chars().peekable();
    while let Some(c) = iter.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && iter.peek() == Some(&' ') {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }

    sentences
}

/// Last `target_tokens` worth of words from the end of a flushed buffer.
fn overlap_text(text: &str, target_tokens: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let target_words = (target_tokens as f64 / 1.33) as usize;
    if target_words == 0 || words.len() <= target_words {
        return String::new();
    }
    words[words.len() - target_words..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctree::DocTree;

    fn node(title: &str, text: &str) -> DocNode {
        DocNode {
            title: title.to_string(),
            text: text.to_string(),
            ..DocNode::default()
        }
    }

    #[test]
    fn test_small_tree_fits_one_chunk() {
        let tree = DocTree {
            title: "Small".to_string(),
            children: vec![node("Section", &"word ".repeat(200))],
        };
        let cfg = ChunkConfig {
            chunk_size: 1500,
            chunk_overlap: 200,
            min_chunk: 50,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert!(chunks[0].text.contains("word"));
    }

    #[test]
    fn test_large_tree_requires_splitting() {
        let large = "The quick brown fox jumps over the lazy dog. ".repeat(300);
        let tree = DocTree {
            title: "Large".to_string(),
            children: vec![node("Big Section", &large)],
        };
        let cfg = ChunkConfig {
            chunk_size: 500,
            chunk_overlap: 50,
            min_chunk: 10,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert!(chunks.len() >= 2, "expected split, got {}", chunks.len());

        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i, "indices must be sequential");
            // Paragraph/sentence boundaries allow mild overflow; 2x is the
            // generous ceiling.
            assert!(estimate_tokens(&c.text) <= cfg.chunk_size * 2);
        }
    }

    #[test]
    fn test_breadcrumb_propagation() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![DocNode {
                title: "Chapter 1".to_string(),
                children: vec![node("Section 1.1", &"content ".repeat(200))],
                ..DocNode::default()
            }],
        };
        let cfg = ChunkConfig {
            chunk_size: 2000,
            chunk_overlap: 100,
            min_chunk: 10,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].breadcrumb, vec!["Chapter 1", "Section 1.1"]);
    }

    #[test]
    fn test_breadcrumb_isolation_between_siblings() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![
                node("A", &"alpha ".repeat(200)),
                node("B", &"beta ".repeat(200)),
            ],
        };
        let cfg = ChunkConfig {
            chunk_size: 2000,
            chunk_overlap: 100,
            min_chunk: 10,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].breadcrumb, vec!["A"]);
        assert_eq!(chunks[1].breadcrumb, vec!["B"]);
    }

    #[test]
    fn test_min_chunk_filtering() {
        let tree = DocTree {
            title: "Tiny".to_string(),
            children: vec![node("Short", "Hi")],
        };
        let chunks = chunk_tree(&tree, ChunkConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let tree = DocTree {
            title: "Empty".to_string(),
            children: vec![],
        };
        assert!(chunk_tree(&tree, ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_zero_config_falls_back_to_defaults() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![node("", &"word ".repeat(200))],
        };
        let cfg = ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            min_chunk: 0,
        };
        let chunks = chunk_tree(&tree, cfg);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_container_node_contributes_only_breadcrumb() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![DocNode {
                title: "Container".to_string(),
                children: vec![node("Leaf", &"leaf content ".repeat(100))],
                ..DocNode::default()
            }],
        };
        let cfg = ChunkConfig {
            chunk_size: 2000,
            chunk_overlap: 100,
            min_chunk: 10,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].breadcrumb, vec!["Container", "Leaf"]);
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let large = "alpha beta gamma delta epsilon zeta eta theta. ".repeat(120);
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![node("S", &large)],
        };
        let cfg = ChunkConfig {
            chunk_size: 200,
            chunk_overlap: 40,
            min_chunk: 10,
        };

        let chunks = chunk_tree(&tree, cfg);
        assert!(chunks.len() >= 2);
        let first_tail: Vec<&str> = chunks[0].text.split_whitespace().rev().take(5).collect();
        for word in first_tail {
            assert!(chunks[1].text.contains(word));
        }
    }

    #[test]
    fn test_page_range_carries_owning_node_page() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![DocNode {
                title: "Page 3".to_string(),
                text: "content ".repeat(200),
                page: 3,
                children: vec![],
            }],
        };
        let cfg = ChunkConfig {
            chunk_size: 2000,
            chunk_overlap: 100,
            min_chunk: 10,
        };
        let chunks = chunk_tree(&tree, cfg);
        assert_eq!(chunks[0].page_start, 3);
        assert_eq!(chunks[0].page_end, 3);
    }
}
