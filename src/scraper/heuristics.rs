//! Building blocks shared by both extractors: ordered strategy chains, markup normalization to
//! `<p>`/`<br/>` fragments, and next-link resolution.

use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

/// One heuristic: looks at a parsed page and either produces a value or declines.
pub type Strategy<T> = fn(&Html) -> Option<T>;

/// Evaluate `strategies` left to right; the first `Some` wins.
pub fn first_match<T>(doc: &Html, strategies: &[(&str, Strategy<T>)]) -> Option<T> {
    strategies.iter().find_map(|(name, strategy)| {
        let found = strategy(doc);
        if found.is_some() {
            debug!(strategy = *name, "heuristic matched");
        }
        found
    })
}

/// First element matching `sel`. An unparsable selector is treated as a miss.
pub fn select_first<'a>(doc: &'a Html, sel: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(sel).ok()?;
    doc.select(&selector).next()
}

/// Trimmed text of the first element matching `sel`, if non-empty.
pub fn select_text(doc: &Html, sel: &str) -> Option<String> {
    select_first(doc, sel)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Non-empty `href` of the first element matching `sel`.
pub fn select_href(doc: &Html, sel: &str) -> Option<String> {
    select_first(doc, sel).and_then(|e| usable_href(&e))
}

/// Trimmed `href` of a link; `None` when missing, blank or `#`.
pub fn usable_href(el: &ElementRef<'_>) -> Option<String> {
    el.value()
        .attr("href")
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty() && h != "#")
}

pub fn link_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Body from a container: its paragraphs rewrapped one by one, or, when it has none, its sanitized
/// inner content. `None` when the container is absent or yields nothing.
pub fn container_body(doc: &Html, container: &str) -> Option<String> {
    let root = select_first(doc, container)?;
    let body = paragraphs_within(doc, container).or_else(|| sanitize_inner(root));
    body.filter(|b| !b.is_empty())
}

/// Every `<p>` under any element matching `container`, in document order.
pub fn paragraphs_within(doc: &Html, container: &str) -> Option<String> {
    let selector = Selector::parse(&format!("{} p", container)).ok()?;
    let body = doc
        .select(&selector)
        .map(paragraph_markup)
        .collect::<String>();
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Rewrap one paragraph as `<p>…</p>`, keeping only text and line breaks.
pub fn paragraph_markup(p: ElementRef<'_>) -> String {
    let mut inner = String::new();
    push_inline(p, &mut inner);
    format!("<p>{}</p>", inner.trim())
}

/// Fallback for containers without paragraphs: split their content into paragraphs at block
/// boundaries and `<br>` runs are kept inline.
pub fn sanitize_inner(container: ElementRef<'_>) -> Option<String> {
    let mut out = String::new();
    let mut line = String::new();
    push_blocks(container, &mut line, &mut out);
    flush_line(&mut line, &mut out);
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "button", "form", "rt", "rp", "svg",
];
const BLOCK_ELEMENTS: &[&str] = &[
    "div", "p", "section", "article", "blockquote", "ul", "ol", "li", "h1", "h2", "h3", "h4",
    "h5", "h6", "table", "tr", "header", "footer", "aside", "nav",
];

fn push_inline(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(e) => {
                let name = e.name();
                if name == "br" {
                    out.push_str("<br/>");
                } else if !SKIPPED_ELEMENTS.contains(&name) {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        push_inline(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_blocks(el: ElementRef<'_>, line: &mut String, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => line.push_str(&escape_text(text)),
            Node::Element(e) => {
                let name = e.name();
                if name == "br" {
                    line.push_str("<br/>");
                } else if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                } else if let Some(child_el) = ElementRef::wrap(child) {
                    if BLOCK_ELEMENTS.contains(&name) {
                        flush_line(line, out);
                        push_blocks(child_el, line, out);
                        flush_line(line, out);
                    } else {
                        push_inline(child_el, line);
                    }
                }
            }
            _ => {}
        }
    }
}

fn flush_line(line: &mut String, out: &mut String) {
    let text = line.trim();
    if !text.is_empty() {
        out.push_str("<p>");
        out.push_str(text);
        out.push_str("</p>");
    }
    line.clear();
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Make a next-link absolute. Relative links resolve against the origin of the page they came
/// from; `default_origin` is only used when `page_url` itself cannot be parsed.
pub fn resolve_href(href: &str, page_url: &str, default_origin: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let joined = Url::parse(page_url).ok().and_then(|page| {
        let origin = Url::parse(&page.origin().ascii_serialization()).ok()?;
        origin.join(href).ok()
    });
    match joined {
        Some(u) => u.to_string(),
        None => {
            let default_origin = default_origin.trim_end_matches('/');
            if href.starts_with('/') {
                format!("{}{}", default_origin, href)
            } else {
                format!("{}/{}", default_origin, href)
            }
        }
    }
}
