//! Table conversion
//!
//! One `tableRow` per `<tr>`, in source order. Cells under `<thead>` become
//! header cells, every other cell is a data cell, so a table without an
//! explicit header section has no header row. Cell content goes through the
//! block converter, so cells may hold several blocks.

use crate::block::{Converter, or_empty_paragraph};
use crate::dom::{Child, attr, children, tag};
use crate::error::ConvertError;
use adf_model::{CellAttrs, Node, Table, TableCell, TableRow};
use scraper::ElementRef;

impl Converter<'_, '_, '_> {
    /// Convert a `<table>`. The caption, if any, becomes a paragraph
    /// immediately before the table.
    pub(crate) fn convert_table(
        &mut self,
        table: ElementRef<'_>,
    ) -> Result<Vec<Node>, ConvertError> {
        self.nested(|this| {
            let mut caption = Vec::new();
            let mut rows = Vec::new();

            for child in children(table) {
                let Child::Element(element) = child else {
                    continue;
                };
                match tag(element) {
                    "caption" => caption.extend(this.convert_children(element)?),
                    "tr" => rows.push(this.convert_row(element, false)?),
                    "thead" | "tbody" | "tfoot" => {
                        let header = tag(element) == "thead";
                        for row in section_rows(element) {
                            rows.push(this.convert_row(row, header)?);
                        }
                    }
                    _ => {}
                }
            }

            let mut result = caption;
            result.push(Node::table(rows));
            Ok(result)
        })
    }

    fn convert_row(&mut self, row: ElementRef<'_>, header: bool) -> Result<Node, ConvertError> {
        let mut cells = Vec::new();
        for child in children(row) {
            let Child::Element(element) = child else {
                continue;
            };
            if !matches!(tag(element), "td" | "th") {
                continue;
            }

            let mut content = Vec::new();
            flatten_nested_tables(self.convert_children(element)?, &mut content);
            let cell = TableCell {
                attrs: CellAttrs {
                    colspan: span(element, "colspan"),
                    rowspan: span(element, "rowspan"),
                },
                content: or_empty_paragraph(content),
            };
            cells.push(if header {
                Node::TableHeaderCell(cell)
            } else {
                Node::TableDataCell(cell)
            });
        }
        Ok(Node::table_row(cells))
    }
}

fn section_rows<'h>(section: ElementRef<'h>) -> impl Iterator<Item = ElementRef<'h>> {
    children(section).filter_map(|child| match child {
        Child::Element(element) if tag(element) == "tr" => Some(element),
        _ => None,
    })
}

/// `colspan`/`rowspan` value, kept only when it spans more than one
fn span(cell: ElementRef<'_>, name: &str) -> Option<u32> {
    attr(cell, name)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|&n| n > 1)
}

/// Tables cannot nest: inline a nested table's cell blocks instead
fn flatten_nested_tables(nodes: Vec<Node>, out: &mut Vec<Node>) {
    for node in nodes {
        match node {
            Node::Table(Table { content }) | Node::TableRow(TableRow { content }) => {
                flatten_nested_tables(content, out)
            }
            Node::TableHeaderCell(TableCell { content, .. })
            | Node::TableDataCell(TableCell { content, .. }) => flatten_nested_tables(content, out),
            other => out.push(other),
        }
    }
}
