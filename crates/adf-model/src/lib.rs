//! adf-model: Atlassian Document Format types for html2adf
//!
//! This crate provides:
//! - ADF node types (the subset produced by the HTML converter)
//! - Inline marks and the ordered, duplicate-free [`MarkSet`]
//! - Serialization to the ADF wire format via serde
//!
//! ## Example
//!
//! ```rust
//! use adf_model::{Doc, Node};
//!
//! let doc = Doc::new(vec![
//!     Node::heading(2, vec![Node::text("Hello")]),
//!     Node::paragraph(vec![Node::link_text("World", "https://example.com")]),
//! ]);
//!
//! let json = serde_json::to_string(&doc).unwrap();
//! assert!(json.starts_with(r#"{"version":1,"type":"doc""#));
//! ```

pub mod adf;
pub mod marks;

pub use adf::{
    ADF_VERSION, Blockquote, BulletList, CellAttrs, Doc, DocKind, Heading, HeadingAttrs, Layout,
    ListItem, Media, MediaAttrs, MediaGroup, MediaKind, MediaSingle, MediaSingleAttrs, Node,
    OrderedList, OrderedListAttrs, Paragraph, Table, TableCell, TableRow, Text,
};
pub use marks::{LinkAttrs, Mark, MarkKind, MarkSet};
