// src/text.rs
//! Plain-text normalization for scraped snippets.

use scraper::{ElementRef, Html};

/// Elements whose boundaries separate words. Inline elements join their
/// text directly, so `Ge<b>such</b>` reads as `Gesuch`.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre",
    "section", "table", "td", "th", "tr", "ul",
];

/// Strip markup, decode entities, collapse whitespace and trim.
///
/// A single pass can expose new markup (`&lt;b&gt;` decodes to `<b>`), so the
/// pass is repeated until the output stops changing, however deeply the input
/// was escaped. That makes `clean(clean(x)) == clean(x)`.
pub fn clean(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Lower-case a normalized string for comparisons.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Text content of an element: inline text nodes are concatenated as they
/// stand, block elements are separated by a space. Not yet collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_children(el, &mut out);
    out
}

fn push_children(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let block = BLOCK_ELEMENTS.contains(&child.value().name());
            if block {
                out.push(' ');
            }
            push_children(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}

fn clean_once(raw: &str) -> String {
    if looks_like_markup(raw) {
        let fragment = Html::parse_fragment(raw);
        collapse_whitespace(&element_text(fragment.root_element()))
    } else {
        collapse_whitespace(raw)
    }
}

fn looks_like_markup(raw: &str) -> bool {
    raw.contains('<') || raw.contains('&')
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
