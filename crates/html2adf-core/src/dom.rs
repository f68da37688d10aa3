//! Helpers over the scraper DOM

use scraper::{ElementRef, Node};

/// A content-bearing child of an element
#[derive(Clone, Copy)]
pub(crate) enum Child<'a> {
    Text(&'a str),
    Element(ElementRef<'a>),
}

/// Text and element children of `parent`, in document order.
/// Comments and other node kinds are skipped.
pub(crate) fn children<'a>(parent: ElementRef<'a>) -> impl Iterator<Item = Child<'a>> + 'a {
    parent.children().filter_map(|node| match node.value() {
        Node::Text(text) => Some(Child::Text(&**text)),
        Node::Element(_) => ElementRef::wrap(node).map(Child::Element),
        _ => None,
    })
}

/// Tags whose content flows into the surrounding paragraph
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "cite", "code", "data", "del", "dfn",
    "em", "font", "i", "img", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span",
    "strike", "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

/// Tags that never carry visible content
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "template", "head", "title", "meta", "link", "noscript",
];

pub(crate) fn tag(element: ElementRef<'_>) -> &str {
    element.value().name()
}

pub(crate) fn is_inline(element: ElementRef<'_>) -> bool {
    INLINE_TAGS.contains(&tag(element))
}

pub(crate) fn is_non_content(element: ElementRef<'_>) -> bool {
    NON_CONTENT_TAGS.contains(&tag(element))
}

/// Trimmed, non-empty attribute value
pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Visible text of an element, whitespace-normalized and trimmed
pub(crate) fn flattened_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in children(element) {
        match child {
            Child::Text(text) => out.push_str(text),
            Child::Element(el) if is_non_content(el) => {}
            Child::Element(el) => {
                if tag(el) == "br" {
                    out.push(' ');
                }
                collect_text(el, out);
            }
        }
    }
}

/// ASCII whitespace as HTML defines it. U+00A0 (`&nbsp;`) is not
/// whitespace and survives collapsing.
pub(crate) fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Collapse whitespace runs to single spaces and trim the ends
pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split(is_html_whitespace)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
