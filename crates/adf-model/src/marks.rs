//! Inline formatting marks
//!
//! A text run carries a [`MarkSet`]: at most one mark of each kind, always
//! kept in canonical kind order so two runs with the same formatting compare
//! equal and serialize identically.

use serde::{Deserialize, Serialize};

/// An ADF mark
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Strong,
    #[serde(rename = "em")]
    Emphasis,
    Underline,
    Strike,
    Code,
    Link { attrs: LinkAttrs },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
}

/// Mark kind, ordered as marks are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkKind {
    Strong,
    Emphasis,
    Underline,
    Strike,
    Code,
    Link,
}

impl Mark {
    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link {
            attrs: LinkAttrs { href: href.into() },
        }
    }

    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Strong => MarkKind::Strong,
            Mark::Emphasis => MarkKind::Emphasis,
            Mark::Underline => MarkKind::Underline,
            Mark::Strike => MarkKind::Strike,
            Mark::Code => MarkKind::Code,
            Mark::Link { .. } => MarkKind::Link,
        }
    }

    /// Link target, if this is a link mark
    pub fn href(&self) -> Option<&str> {
        match self {
            Mark::Link { attrs } => Some(&attrs.href),
            _ => None,
        }
    }
}

/// Ordered, duplicate-free set of marks
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Mark>", into = "Vec<Mark>")]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a mark. A mark of a kind already present replaces it, so the
    /// innermost link wins when anchors nest.
    pub fn insert(&mut self, mark: Mark) {
        let kind = mark.kind();
        match self.0.binary_search_by_key(&kind, Mark::kind) {
            Ok(pos) => self.0[pos] = mark,
            Err(pos) => self.0.insert(pos, mark),
        }
    }

    /// Copy of this set with `mark` added
    pub fn with(&self, mark: Mark) -> Self {
        let mut set = self.clone();
        set.insert(mark);
        set
    }

    pub fn contains_kind(&self, kind: MarkKind) -> bool {
        self.0.iter().any(|m| m.kind() == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }
}

impl From<Vec<Mark>> for MarkSet {
    fn from(marks: Vec<Mark>) -> Self {
        let mut set = MarkSet::new();
        for mark in marks {
            set.insert(mark);
        }
        set
    }
}

impl From<MarkSet> for Vec<Mark> {
    fn from(set: MarkSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_canonical_order() {
        let mut set = MarkSet::new();
        set.insert(Mark::link("https://a.io"));
        set.insert(Mark::Code);
        set.insert(Mark::Strong);
        set.insert(Mark::Emphasis);

        let kinds: Vec<MarkKind> = set.iter().map(Mark::kind).collect();
        assert_eq!(
            kinds,
            vec![
                MarkKind::Strong,
                MarkKind::Emphasis,
                MarkKind::Code,
                MarkKind::Link
            ]
        );
    }

    #[test]
    fn test_duplicate_kinds_collapse() {
        let mut set = MarkSet::new();
        set.insert(Mark::Strong);
        set.insert(Mark::Strong);
        assert_eq!(set.len(), 1);

        set.insert(Mark::link("https://outer.io"));
        set.insert(Mark::link("https://inner.io"));
        assert_eq!(set.len(), 2);
        let href = set.iter().find_map(Mark::href);
        assert_eq!(href, Some("https://inner.io"));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = MarkSet::from(vec![Mark::Emphasis, Mark::Strong]);
        let b = MarkSet::from(vec![Mark::Strong, Mark::Emphasis]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_with_leaves_original_untouched() {
        let base = MarkSet::from(vec![Mark::Strong]);
        let extended = base.with(Mark::Underline);
        assert_eq!(base.len(), 1);
        assert!(extended.contains_kind(MarkKind::Underline));
        assert!(extended.contains_kind(MarkKind::Strong));
    }

    #[test]
    fn test_wire_names() {
        let set = MarkSet::from(vec![
            Mark::Emphasis,
            Mark::Strike,
            Mark::link("https://x.io"),
        ]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"em"},{"type":"strike"},{"type":"link","attrs":{"href":"https://x.io"}}]"#
        );
    }

    #[test]
    fn test_deserialize_normalizes_duplicates() {
        let set: MarkSet =
            serde_json::from_str(r#"[{"type":"code"},{"type":"strong"},{"type":"code"}]"#).unwrap();
        assert_eq!(set, MarkSet::from(vec![Mark::Strong, Mark::Code]));
    }
}
