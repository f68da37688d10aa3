//! Page title extraction
//!
//! The first top-level `<h1>` with visible text becomes the page title and is
//! removed from the body, so the published page does not repeat it.

use crate::dom::flattened_text;
use log::debug;
use scraper::{ElementRef, Html};
use std::ops::Range;

/// Title and the HTML that remains once the title heading is removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSplit {
    pub title: Option<String>,
    pub content: String,
}

/// Split the page title off an HTML fragment
///
/// Blank `<h1>` elements never qualify. When no heading qualifies, the
/// content is returned unchanged, byte for byte. Otherwise the heading's
/// source text is cut out and the rest is kept as written; only when that
/// cut cannot be located is the remainder re-serialized from the DOM.
pub fn extract_title(html: &str) -> TitleSplit {
    let unchanged = || TitleSplit {
        title: None,
        content: html.to_string(),
    };
    if html.trim().is_empty() {
        return unchanged();
    }

    let mut fragment = Html::parse_fragment(html);
    let root = fragment.root_element();
    let found = root
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "h1")
        .find_map(|heading| {
            let text = flattened_text(heading);
            // A heading of only `&nbsp;` is blank too
            (!text.trim().is_empty()).then(|| (heading.id(), text))
        });

    let Some((id, title)) = found else {
        return unchanged();
    };
    // Position among all <h1> start tags, nested ones included
    let index = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "h1")
        .position(|element| element.id() == id);

    if let Some(mut heading) = fragment.tree.get_mut(id) {
        heading.detach();
    }
    let serialized = fragment.root_element().inner_html();

    let content = index
        .and_then(|index| heading_span(html, index))
        .map(|span| format!("{}{}", &html[..span.start], &html[span.end..]))
        // The cut must parse to the same tree as the DOM removal
        .filter(|cut| Html::parse_fragment(cut).root_element().inner_html() == serialized)
        .unwrap_or_else(|| {
            debug!("Title heading not found in source, re-serializing content");
            serialized
        });

    TitleSplit {
        title: Some(title),
        content,
    }
}

/// Byte range of the `index`-th `<h1>` element in `html`, from its start tag
/// through the heading end tag that closes it
fn heading_span(html: &str, index: usize) -> Option<Range<usize>> {
    // ASCII lowercasing keeps byte offsets
    let lower = html.to_ascii_lowercase();
    let mut pos = 0;
    let mut seen = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        let rest = &lower[start..];

        if rest.starts_with("<!--") {
            pos = start + rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }
        if let Some(raw) = ["script", "style", "textarea", "title"]
            .into_iter()
            .find(|name| opens_tag(rest, name))
        {
            let close = format!("</{}", raw);
            pos = start + rest.find(&close).unwrap_or(rest.len());
            continue;
        }
        if opens_tag(rest, "h1") {
            if seen == index {
                let open_end = start + rest.find('>')? + 1;
                return Some(start..open_end + closing_heading_end(&lower[open_end..])?);
            }
            seen += 1;
        }
        pos = start + 1;
    }
    None
}

/// `rest` starts with the start tag `<name`
fn opens_tag(rest: &str, name: &str) -> bool {
    rest.strip_prefix('<')
        .and_then(|r| r.strip_prefix(name))
        .is_some_and(|after| {
            after
                .bytes()
                .next()
                .is_none_or(|b| b.is_ascii_whitespace() || b == b'>' || b == b'/')
        })
}

/// Offset just past the first `</h1>`..`</h6>` end tag; any of them closes
/// an open heading
fn closing_heading_end(rest: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = rest[pos..].find("</h") {
        let start = pos + offset;
        let level = rest.as_bytes().get(start + 3).copied();
        if level.is_some_and(|b| (b'1'..=b'6').contains(&b)) {
            return rest[start..].find('>').map(|end| start + end + 1);
        }
        pos = start + 3;
    }
    None
}
