//! Whole-document rewrites on serialized ADF
//!
//! These passes work on [`serde_json::Value`] so they apply to any ADF
//! document, including ones produced by other exporters. Both are
//! idempotent.
//!
//! [`convert_page`](crate::convert_page) only centers media. Marker
//! splicing trusts the text it finds, so it is meant for documents whose
//! markers were written by an exporter, never for converted page text.

use log::{debug, warn};
use serde_json::{Map, Value};

pub const TABLE_MARKER_START: &str = "<!-- ADF_TABLE_START -->";
pub const TABLE_MARKER_END: &str = "<!-- ADF_TABLE_END -->";
pub const NODE_MARKER_START: &str = "<!-- ADF_NODE_START -->";
pub const NODE_MARKER_END: &str = "<!-- ADF_NODE_END -->";

const MARKERS: [(&str, &str); 2] = [
    (TABLE_MARKER_START, TABLE_MARKER_END),
    (NODE_MARKER_START, NODE_MARKER_END),
];

/// Counts of rewrites performed by [`post_process`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessReport {
    pub spliced: usize,
    pub centered: usize,
}

/// Run marker substitution, then center alignment when `center_media` is set
pub fn post_process(document: &mut Value, center_media: bool) -> PostProcessReport {
    let spliced = splice_markers(document);
    let centered = if center_media {
        center_media_single(document)
    } else {
        0
    };
    if spliced + centered > 0 {
        debug!(
            "Post-processing spliced {} marker(s), centered {} media node(s)",
            spliced, centered
        );
    }
    PostProcessReport { spliced, centered }
}

/// Replace marker paragraphs with the ADF node embedded between the markers
///
/// A marker paragraph has a single text child whose text is exactly a start
/// marker, a serialized ADF node, and the matching end marker. A fragment
/// that does not parse as an ADF node is logged and left in place.
pub fn splice_markers(value: &mut Value) -> usize {
    let mut count = 0;
    splice_in(value, &mut count);
    count
}

fn splice_in(value: &mut Value, count: &mut usize) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                while let Some(node) = embedded_node(item) {
                    *item = node;
                    *count += 1;
                }
                splice_in(item, count);
            }
        }
        Value::Object(map) => {
            for child in map.values_mut() {
                splice_in(child, count);
            }
        }
        _ => {}
    }
}

fn embedded_node(value: &Value) -> Option<Value> {
    let node = value.as_object()?;
    if node_type(node) != Some("paragraph") {
        return None;
    }
    let [text_node] = node.get("content")?.as_array()?.as_slice() else {
        return None;
    };
    let text_node = text_node.as_object()?;
    if node_type(text_node) != Some("text") {
        return None;
    }
    let text = text_node.get("text")?.as_str()?.trim();

    let fragment = MARKERS.iter().find_map(|(start, end)| {
        text.strip_prefix(start)
            .and_then(|rest| rest.strip_suffix(end))
    })?;

    match serde_json::from_str::<Value>(fragment) {
        Ok(parsed) if parsed.as_object().is_some_and(|obj| node_type(obj).is_some()) => {
            Some(parsed)
        }
        Ok(_) => {
            warn!("Embedded ADF fragment is not a node; leaving marker in place");
            None
        }
        Err(err) => {
            warn!("Failed to parse embedded ADF fragment: {}", err);
            None
        }
    }
}

fn node_type(node: &Map<String, Value>) -> Option<&str> {
    node.get("type").and_then(Value::as_str)
}

/// Force `layout: "center"` on every `mediaSingle` node
pub fn center_media_single(value: &mut Value) -> usize {
    let mut count = 0;
    center_in(value, &mut count);
    count
}

fn center_in(value: &mut Value, count: &mut usize) {
    let Some(node) = value.as_object_mut() else {
        return;
    };

    if node_type(node) == Some("mediaSingle") {
        let attrs = node
            .entry("attrs")
            .or_insert_with(|| Value::Object(Map::new()));
        if !attrs.is_object() {
            *attrs = Value::Object(Map::new());
        }
        if let Some(attrs) = attrs.as_object_mut()
            && attrs.get("layout").and_then(Value::as_str) != Some("center")
        {
            attrs.insert("layout".to_string(), Value::String("center".to_string()));
            *count += 1;
        }
    }

    if let Some(Value::Array(children)) = node.get_mut("content") {
        for child in children {
            center_in(child, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marker_paragraph(start: &str, fragment: &str, end: &str) -> Value {
        json!({
            "type": "paragraph",
            "content": [{"type": "text", "text": format!("{start}{fragment}{end}")}]
        })
    }

    #[test]
    fn test_table_marker_is_spliced() {
        let table = r#"{"type":"table","content":[{"type":"tableRow","content":[]}]}"#;
        let mut doc = json!({
            "version": 1,
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "before"}]},
                marker_paragraph(TABLE_MARKER_START, table, TABLE_MARKER_END),
                {"type": "paragraph", "content": [{"type": "text", "text": "after"}]}
            ]
        });

        assert_eq!(splice_markers(&mut doc), 1);
        assert_eq!(doc["content"][1]["type"], "table");
        assert_eq!(doc["content"][0]["content"][0]["text"], "before");
        assert_eq!(doc["content"][2]["content"][0]["text"], "after");
    }

    #[test]
    fn test_nested_node_marker() {
        let rule = r#"{"type":"rule"}"#;
        let mut doc = json!({
            "type": "doc",
            "content": [{
                "type": "blockquote",
                "content": [marker_paragraph(NODE_MARKER_START, rule, NODE_MARKER_END)]
            }]
        });

        assert_eq!(splice_markers(&mut doc), 1);
        assert_eq!(doc["content"][0]["content"][0], json!({"type": "rule"}));
    }

    #[test]
    fn test_malformed_fragment_left_untouched() {
        let broken = marker_paragraph(TABLE_MARKER_START, r#"{"type":"table","#, TABLE_MARKER_END);
        let not_a_node = marker_paragraph(NODE_MARKER_START, "[1, 2]", NODE_MARKER_END);
        let mut doc = json!({"type": "doc", "content": [broken.clone(), not_a_node.clone()]});

        assert_eq!(splice_markers(&mut doc), 0);
        assert_eq!(doc["content"][0], broken);
        assert_eq!(doc["content"][1], not_a_node);
    }

    #[test]
    fn test_mismatched_markers_ignored() {
        let mixed = marker_paragraph(TABLE_MARKER_START, r#"{"type":"rule"}"#, NODE_MARKER_END);
        let mut doc = json!({"type": "doc", "content": [mixed.clone()]});

        assert_eq!(splice_markers(&mut doc), 0);
        assert_eq!(doc["content"][0], mixed);
    }

    #[test]
    fn test_center_media_single() {
        let mut doc = json!({
            "type": "doc",
            "content": [
                {"type": "mediaSingle", "attrs": {"layout": "wrap-left"}, "content": []},
                {"type": "mediaSingle", "content": []},
                {"type": "mediaSingle", "attrs": {"layout": "center"}, "content": []},
                {"type": "table", "content": [{"type": "tableRow", "content": [{
                    "type": "tableCell",
                    "content": [{"type": "mediaSingle", "attrs": {"layout": "wide", "width": 50}, "content": []}]
                }]}]}
            ]
        });

        assert_eq!(center_media_single(&mut doc), 3);
        assert_eq!(doc["content"][0]["attrs"]["layout"], "center");
        assert_eq!(doc["content"][1]["attrs"]["layout"], "center");
        let nested = &doc["content"][3]["content"][0]["content"][0]["content"][0];
        assert_eq!(nested["attrs"]["layout"], "center");
        assert_eq!(nested["attrs"]["width"], 50);
    }

    #[test]
    fn test_post_process_is_idempotent() {
        let table = r#"{"type":"table","content":[]}"#;
        let mut doc = json!({
            "type": "doc",
            "content": [
                marker_paragraph(TABLE_MARKER_START, table, TABLE_MARKER_END),
                {"type": "mediaSingle", "attrs": {"layout": "full-width"}, "content": []}
            ]
        });

        let first = post_process(&mut doc, true);
        assert_eq!(first, PostProcessReport { spliced: 1, centered: 1 });
        let after_first = doc.clone();

        let second = post_process(&mut doc, true);
        assert_eq!(second, PostProcessReport::default());
        assert_eq!(doc, after_first);
    }

    #[test]
    fn test_centering_disabled() {
        let mut doc = json!({
            "type": "doc",
            "content": [{"type": "mediaSingle", "attrs": {"layout": "wide"}, "content": []}]
        });
        post_process(&mut doc, false);
        assert_eq!(doc["content"][0]["attrs"]["layout"], "wide");
    }
}
