//! HTML parser built on scraper.

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::doctree::DocTree;

use super::{title_from_filename, Parser, SectionBuilder};

/// Elements whose subtree never contributes content.
const SKIP_TAGS: &[&str] = &["script", "style", "nav", "header", "footer"];
/// Elements whose text is collected wholesale.
const CONTENT_TAGS: &[&str] = &["p", "li", "td", "blockquote"];

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));
static WALK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, td, blockquote").expect("valid selector")
});

/// Builds a [`DocTree`] from h1–h6 nesting; `<title>` overrides the tree
/// title, content tags accumulate text, and boilerplate containers are
/// skipped.
pub struct HtmlParser;

impl Parser for HtmlParser {
    fn parse(&self, data: &[u8], filename: &str) -> Result<DocTree> {
        let content = String::from_utf8_lossy(data);
        let document = Html::parse_document(&content);

        let mut title = title_from_filename(filename);
        if let Some(el) = document.select(&TITLE_SELECTOR).next() {
            let t = element_text(&el);
            if !t.is_empty() {
                title = t;
            }
        }

        let mut builder = SectionBuilder::new();
        for el in document.select(&WALK_SELECTOR) {
            if has_ancestor_in(&el, SKIP_TAGS) || has_ancestor_in(&el, CONTENT_TAGS) {
                continue;
            }
            let name = el.value().name();
            match heading_level(name) {
                Some(level) => {
                    if !has_ancestor_heading(&el) {
                        builder.open_section(level, element_text(&el));
                    }
                }
                None => builder.push_text(&element_text(&el)),
            }
        }

        Ok(DocTree {
            title,
            children: builder.finish(),
        })
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn has_ancestor_in(el: &ElementRef, names: &[&str]) -> bool {
    el.ancestors().any(|a| {
        a.value()
            .as_element()
            .map_or(false, |e| names.contains(&e.name()))
    })
}

fn has_ancestor_heading(el: &ElementRef) -> bool {
    el.ancestors().any(|a| {
        a.value()
            .as_element()
            .map_or(false, |e| heading_level(e.name()).is_some())
    })
}
