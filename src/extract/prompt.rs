//! Extraction prompt construction.

/// Instructions sent ahead of every chunk.
pub const EXTRACTION_PROMPT: &str = r#"Extract structured facts from the following document section. Return a JSON array of facts. Each fact object must have these fields:

- "text": concise statement of the fact (string, max 200 chars)
- "category": one of "entity_fact", "preference", "topic_knowledge", "procedure"
- "entity": the person or thing this fact is about (string or null)
- "topics": list of topic slugs relevant to this fact (list of strings, max 3)
- "salience": importance from 0.1 to 1.0 (float)
- "supersedes": list of paths of existing memories this fact replaces (list of strings, default [])
- "min_trust": minimum trust level (integer 0-10) to retrieve this memory (default 0)

Rules:
- Only extract concrete, factual information — not opinions or speculation
- Prefer specific facts over vague generalizations
- Extract ONE fact per distinct attribute or trait
- The "text" field MUST name the entity it's about. Write "Milo plays fetch" not "plays fetch". Each fact should be understandable on its own.
- Entity names should be lowercase, no spaces (use underscores)
- Topic slugs should be lowercase, hyphenated
- Salience: personal facts=0.7, topic knowledge=0.5, procedures=0.6
- Default min_trust to 0. Most facts should be 0.
- Do NOT extract episode-type facts from documents
- Return an empty array [] if nothing worth remembering

Respond with ONLY the JSON array, no other text."#;

/// Builds the full prompt for one chunk, including the document title and
/// the section breadcrumb when present.
pub fn build_chunk_prompt(doc_title: &str, breadcrumb: &[String], chunk_text: &str) -> String {
    let mut out = String::with_capacity(EXTRACTION_PROMPT.len() + chunk_text.len() + 128);
    out.push_str(EXTRACTION_PROMPT);
    out.push_str("\n\n---\n");
    out.push_str(&format!("Document: {doc_title}\n"));
    if !breadcrumb.is_empty() {
        out.push_str("Section: ");
        out.push_str(&breadcrumb.join(" > "));
        out.push('\n');
    }
    out.push_str("---\n");
    out.push_str(chunk_text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_title_and_breadcrumb() {
        let bc = vec!["Financial Results".to_string(), "Revenue".to_string()];
        let p = build_chunk_prompt("Annual Report", &bc, "Revenue grew 10%.");
        assert!(p.starts_with(EXTRACTION_PROMPT));
        assert!(p.contains("Document: Annual Report\n"));
        assert!(p.contains("Section: Financial Results > Revenue\n"));
        assert!(p.ends_with("Revenue grew 10%."));
    }

    #[test]
    fn test_prompt_omits_section_line_without_breadcrumb() {
        let p = build_chunk_prompt("Notes", &[], "Plain text.");
        assert!(!p.contains("Section:"));
        assert!(p.contains("Document: Notes\n"));
    }
}
