//! ADF (Atlassian Document Format) node types
//!
//! The subset of ADF nodes produced by the HTML converter.
//! Reference: https://developer.atlassian.com/cloud/jira/platform/apis/document/structure/

use crate::marks::{Mark, MarkSet};
use serde::{Deserialize, Serialize};

/// ADF schema version written into every document
pub const ADF_VERSION: u32 = 1;

/// Root node of an ADF document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: DocKind,
    pub content: Vec<Node>,
}

/// Type tag of the root node; always `doc`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocKind {
    #[default]
    Doc,
}

/// An ADF node below the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    // Block nodes
    Heading(Heading),
    Paragraph(Paragraph),
    BulletList(BulletList),
    OrderedList(OrderedList),
    ListItem(ListItem),
    Blockquote(Blockquote),
    Rule,

    // Tables
    Table(Table),
    TableRow(TableRow),
    #[serde(rename = "tableHeader")]
    TableHeaderCell(TableCell),
    #[serde(rename = "tableCell")]
    TableDataCell(TableCell),

    // Media
    MediaGroup(MediaGroup),
    MediaSingle(MediaSingle),
    Media(Media),

    // Inline nodes
    Text(Text),
}

/// Heading node (level 1 to 6)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub attrs: HeadingAttrs,
    #[serde(default)]
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

/// Paragraph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub content: Vec<Node>,
}

/// Bullet list node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletList {
    pub content: Vec<Node>,
}

/// Ordered list node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<OrderedListAttrs>,
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    pub order: u32,
}

/// List item node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub content: Vec<Node>,
}

/// Blockquote node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blockquote {
    pub content: Vec<Node>,
}

/// Table node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub content: Vec<Node>,
}

/// Table row node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub content: Vec<Node>,
}

/// Table cell, shared by header and data cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default, skip_serializing_if = "CellAttrs::is_empty")]
    pub attrs: CellAttrs,
    pub content: Vec<Node>,
}

/// Cell spanning attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u32>,
}

impl CellAttrs {
    pub fn is_empty(&self) -> bool {
        self.colspan.is_none() && self.rowspan.is_none()
    }
}

/// Container for one or more media nodes, rendered as a file strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaGroup {
    pub content: Vec<Node>,
}

/// Container for a single media node, rendered inline with a layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSingle {
    #[serde(default)]
    pub attrs: MediaSingleAttrs,
    pub content: Vec<Node>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSingleAttrs {
    pub layout: Layout,
}

/// Media layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Center,
    WrapLeft,
    WrapRight,
    Wide,
    FullWidth,
}

/// Media node referencing an uploaded attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub attrs: MediaAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttrs {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub id: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    #[default]
    File,
    Link,
}

/// Text node with its marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "MarkSet::is_empty")]
    pub marks: MarkSet,
}

// Convenience constructors
impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(Text {
            text: s.into(),
            marks: MarkSet::new(),
        })
    }

    pub fn marked_text(s: impl Into<String>, marks: MarkSet) -> Self {
        Node::Text(Text {
            text: s.into(),
            marks,
        })
    }

    pub fn link_text(s: impl Into<String>, href: impl Into<String>) -> Self {
        Node::marked_text(s, MarkSet::from(vec![Mark::link(href)]))
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph(Paragraph { content })
    }

    /// Heading; the level is clamped to 1..=6
    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading(Heading {
            attrs: HeadingAttrs {
                level: level.clamp(1, 6),
            },
            content,
        })
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::BulletList(BulletList { content: items })
    }

    pub fn ordered_list(items: Vec<Node>) -> Self {
        Node::OrderedList(OrderedList {
            attrs: None,
            content: items,
        })
    }

    pub fn ordered_list_from(order: u32, items: Vec<Node>) -> Self {
        Node::OrderedList(OrderedList {
            attrs: Some(OrderedListAttrs { order }),
            content: items,
        })
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem(ListItem { content })
    }

    pub fn blockquote(content: Vec<Node>) -> Self {
        Node::Blockquote(Blockquote { content })
    }

    pub fn rule() -> Self {
        Node::Rule
    }

    pub fn table(rows: Vec<Node>) -> Self {
        Node::Table(Table { content: rows })
    }

    pub fn table_row(cells: Vec<Node>) -> Self {
        Node::TableRow(TableRow { content: cells })
    }

    pub fn table_header(content: Vec<Node>) -> Self {
        Node::TableHeaderCell(TableCell {
            attrs: CellAttrs::default(),
            content,
        })
    }

    pub fn table_cell(content: Vec<Node>) -> Self {
        Node::TableDataCell(TableCell {
            attrs: CellAttrs::default(),
            content,
        })
    }

    pub fn media_group(media: Vec<Node>) -> Self {
        Node::MediaGroup(MediaGroup { content: media })
    }

    pub fn media_single(layout: Layout, media: Node) -> Self {
        Node::MediaSingle(MediaSingle {
            attrs: MediaSingleAttrs { layout },
            content: vec![media],
        })
    }

    pub fn media_file(
        id: impl Into<String>,
        collection: impl Into<String>,
        alt: Option<String>,
    ) -> Self {
        Node::Media(Media {
            attrs: MediaAttrs {
                kind: MediaKind::File,
                id: id.into(),
                collection: collection.into(),
                alt,
            },
        })
    }

    /// Wire name of this node's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Heading(_) => "heading",
            Node::Paragraph(_) => "paragraph",
            Node::BulletList(_) => "bulletList",
            Node::OrderedList(_) => "orderedList",
            Node::ListItem(_) => "listItem",
            Node::Blockquote(_) => "blockquote",
            Node::Rule => "rule",
            Node::Table(_) => "table",
            Node::TableRow(_) => "tableRow",
            Node::TableHeaderCell(_) => "tableHeader",
            Node::TableDataCell(_) => "tableCell",
            Node::MediaGroup(_) => "mediaGroup",
            Node::MediaSingle(_) => "mediaSingle",
            Node::Media(_) => "media",
            Node::Text(_) => "text",
        }
    }

    /// Child nodes, or `None` for leaves
    pub fn content(&self) -> Option<&[Node]> {
        match self {
            Node::Heading(Heading { content, .. })
            | Node::Paragraph(Paragraph { content })
            | Node::BulletList(BulletList { content })
            | Node::OrderedList(OrderedList { content, .. })
            | Node::ListItem(ListItem { content })
            | Node::Blockquote(Blockquote { content })
            | Node::Table(Table { content })
            | Node::TableRow(TableRow { content })
            | Node::TableHeaderCell(TableCell { content, .. })
            | Node::TableDataCell(TableCell { content, .. })
            | Node::MediaGroup(MediaGroup { content })
            | Node::MediaSingle(MediaSingle { content, .. }) => Some(content),
            Node::Rule | Node::Media(_) | Node::Text(_) => None,
        }
    }

    /// Concatenated literal text of all descendant text nodes
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            other => {
                for child in other.content().unwrap_or_default() {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl Doc {
    pub fn new(content: Vec<Node>) -> Self {
        Self {
            version: ADF_VERSION,
            kind: DocKind::Doc,
            content,
        }
    }
}

impl Default for Doc {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
