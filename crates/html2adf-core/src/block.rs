//! Block-level HTML to ADF conversion
//!
//! A single top-down pass over the DOM. Inline content between block
//! elements is gathered and flushed into paragraphs; block elements are
//! dispatched by tag. Unrecognized block tags are dropped and their children
//! hoisted to the parent level.

use crate::convert::{ConverterOptions, MediaContainer, MediaTarget};
use crate::dom::{Child, attr, children, is_inline, is_non_content, tag};
use crate::error::ConvertError;
use crate::inline::{InlinePiece, RunBuilder};
use crate::media::LOCAL_DIAGRAM_PREFIX;
use adf_model::{Layout, Mark, MarkSet, Node, Table, TableCell, TableRow};
use log::{debug, warn};
use scraper::ElementRef;

/// Converter state
pub(crate) struct Converter<'o, 'r, 'a> {
    pub(crate) options: &'o ConverterOptions,
    media: Option<MediaTarget<'r, 'a>>,
    /// Current element nesting depth
    pub(crate) depth: usize,
}

impl<'o, 'r, 'a> Converter<'o, 'r, 'a> {
    pub(crate) fn new(options: &'o ConverterOptions, media: Option<MediaTarget<'r, 'a>>) -> Self {
        Self {
            options,
            media,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ConvertError>,
    ) -> Result<T, ConvertError> {
        if self.depth >= self.options.max_depth {
            return Err(ConvertError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Convert the children of `parent` to block nodes
    pub(crate) fn convert_children(
        &mut self,
        parent: ElementRef<'_>,
    ) -> Result<Vec<Node>, ConvertError> {
        self.nested(|this| this.convert_nodes(children(parent)))
    }

    pub(crate) fn convert_nodes<'h>(
        &mut self,
        nodes: impl IntoIterator<Item = Child<'h>>,
    ) -> Result<Vec<Node>, ConvertError> {
        let mut result = Vec::new();
        let mut pending: Vec<Child<'h>> = Vec::new();

        for node in nodes {
            match node {
                Child::Element(element) if is_non_content(element) => {}
                // Block-level elements flush the current paragraph
                Child::Element(element) if !is_inline(element) => {
                    self.flush_paragraph(&mut pending, &mut result)?;
                    result.extend(self.convert_block(element)?);
                }
                // Inline content accumulates in the current paragraph
                inline => pending.push(inline),
            }
        }

        self.flush_paragraph(&mut pending, &mut result)?;
        Ok(result)
    }

    fn flush_paragraph<'h>(
        &mut self,
        pending: &mut Vec<Child<'h>>,
        result: &mut Vec<Node>,
    ) -> Result<(), ConvertError> {
        if pending.is_empty() {
            return Ok(());
        }
        let mut builder = RunBuilder::new(self.options.max_depth);
        builder.push_children(pending.drain(..), &MarkSet::new(), self.depth)?;
        self.emit_pieces(builder.finish(), result);
        Ok(())
    }

    /// Paragraphs for text segments, media for the images between them
    fn emit_pieces(&mut self, pieces: Vec<InlinePiece<'_>>, result: &mut Vec<Node>) {
        for piece in pieces {
            match piece {
                InlinePiece::Runs(runs) => result.push(Node::paragraph(runs)),
                InlinePiece::Image(image) => result.extend(self.convert_image(image)),
            }
        }
    }

    fn convert_block(&mut self, element: ElementRef<'_>) -> Result<Vec<Node>, ConvertError> {
        if let Some(level) = heading_level(tag(element)) {
            return self.convert_heading(element, level);
        }

        match tag(element) {
            "p" => {
                let builder = RunBuilder::new(self.options.max_depth);
                self.convert_inline_block(element, builder, &MarkSet::new())
            }
            "pre" => {
                let builder = RunBuilder::new(self.options.max_depth).preformatted();
                self.convert_inline_block(element, builder, &MarkSet::from(vec![Mark::Code]))
            }
            "ul" => self.convert_list(element, false),
            "ol" => self.convert_list(element, true),
            "dl" => self.convert_definition_list(element),
            "blockquote" => self.convert_blockquote(element),
            "hr" => Ok(vec![Node::rule()]),
            "table" => self.convert_table(element),
            // div, section, article and anything unrecognized: hoist children
            _ => self.convert_children(element),
        }
    }

    fn convert_heading(
        &mut self,
        element: ElementRef<'_>,
        level: u8,
    ) -> Result<Vec<Node>, ConvertError> {
        let mut builder = RunBuilder::new(self.options.max_depth).defer_images();
        builder.push_children(children(element), &MarkSet::new(), self.depth + 1)?;
        let (runs, images) = builder.finish_runs();

        let mut result = Vec::new();
        if !runs.is_empty() {
            result.push(Node::heading(level, runs));
        }
        for image in images {
            result.extend(self.convert_image(image));
        }
        Ok(result)
    }

    /// Element whose content is entirely inline (paragraph, pre, dt)
    fn convert_inline_block<'h>(
        &mut self,
        element: ElementRef<'h>,
        mut builder: RunBuilder<'h>,
        marks: &MarkSet,
    ) -> Result<Vec<Node>, ConvertError> {
        builder.push_children(children(element), marks, self.depth + 1)?;
        let mut result = Vec::new();
        self.emit_pieces(builder.finish(), &mut result);
        Ok(result)
    }

    fn convert_list(
        &mut self,
        element: ElementRef<'_>,
        ordered: bool,
    ) -> Result<Vec<Node>, ConvertError> {
        let items = self.nested(|this| {
            let mut items = Vec::new();
            for child in children(element) {
                match child {
                    Child::Element(item) if tag(item) == "li" => {
                        let content = this.convert_children(item)?;
                        items.push(Node::list_item(or_empty_paragraph(content)));
                    }
                    // Stray content directly inside the list
                    other => {
                        let content = this.convert_nodes([other])?;
                        if !content.is_empty() {
                            items.push(Node::list_item(content));
                        }
                    }
                }
            }
            Ok(items)
        })?;

        if items.is_empty() {
            return Ok(Vec::new());
        }
        let list = if !ordered {
            Node::bullet_list(items)
        } else {
            match attr(element, "start").and_then(|s| s.parse::<u32>().ok()) {
                Some(start) => Node::ordered_list_from(start, items),
                None => Node::ordered_list(items),
            }
        };
        Ok(vec![list])
    }

    fn convert_definition_list(
        &mut self,
        element: ElementRef<'_>,
    ) -> Result<Vec<Node>, ConvertError> {
        self.nested(|this| {
            let mut result = Vec::new();
            for child in children(element) {
                match child {
                    Child::Element(term) if tag(term) == "dt" => {
                        let builder = RunBuilder::new(this.options.max_depth);
                        let strong = MarkSet::from(vec![Mark::Strong]);
                        result.extend(this.convert_inline_block(term, builder, &strong)?);
                    }
                    Child::Element(definition) if tag(definition) == "dd" => {
                        result.extend(this.convert_children(definition)?);
                    }
                    // <div> may group dt/dd pairs
                    Child::Element(group) if tag(group) == "div" => {
                        result.extend(this.convert_definition_list(group)?);
                    }
                    other => result.extend(this.convert_nodes([other])?),
                }
            }
            Ok(result)
        })
    }

    fn convert_blockquote(&mut self, element: ElementRef<'_>) -> Result<Vec<Node>, ConvertError> {
        let content = self.convert_children(element)?;
        let mut quoted = Vec::new();
        flatten_into_quote(content, &mut quoted);
        Ok(vec![Node::blockquote(or_empty_paragraph(quoted))])
    }

    /// Resolve an image and wrap it in a media container, or degrade it to
    /// a paragraph when it cannot be resolved
    fn convert_image(&mut self, image: ElementRef<'_>) -> Vec<Node> {
        let alt = attr(image, "alt");
        let Some(src) = attr(image, "src") else {
            warn!("Image without a source, keeping its alt text only");
            return alt
                .map(|alt| vec![Node::paragraph(vec![Node::text(alt)])])
                .unwrap_or_default();
        };

        let Some(target) = self.media.as_mut() else {
            debug!("No attachment target, linking image {}", src);
            return vec![degraded_image(src, alt)];
        };
        match target.resolver.resolve(src, target.page_id) {
            Ok(record) => {
                let caption = attr(image, "title").or(alt).map(str::to_string);
                vec![self.wrap_media(record.media_node(caption))]
            }
            Err(err) => {
                warn!("Could not attach image {}: {}", src, err);
                vec![degraded_image(src, alt)]
            }
        }
    }

    fn wrap_media(&self, media: Node) -> Node {
        match self.options.media_container {
            MediaContainer::Group => Node::media_group(vec![media]),
            MediaContainer::Single => Node::media_single(Layout::Center, media),
        }
    }
}

fn heading_level(tag: &str) -> Option<u8> {
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

/// Placeholder for an image that could not be attached
fn degraded_image(src: &str, alt: Option<&str>) -> Node {
    if let Some(view_key) = src.strip_prefix(LOCAL_DIAGRAM_PREFIX) {
        return Node::paragraph(vec![Node::text(format!("Diagram: {view_key}"))]);
    }
    Node::paragraph(vec![Node::link_text(alt.unwrap_or(src), src)])
}

/// List items, cells and quotes need at least one child
pub(crate) fn or_empty_paragraph(content: Vec<Node>) -> Vec<Node> {
    if content.is_empty() {
        vec![Node::paragraph(Vec::new())]
    } else {
        content
    }
}

/// Keep only what a blockquote may contain: headings become paragraphs,
/// nested quotes and tables are flattened, rules are dropped
fn flatten_into_quote(nodes: Vec<Node>, out: &mut Vec<Node>) {
    for node in nodes {
        match node {
            Node::Heading(heading) => out.push(Node::paragraph(heading.content)),
            Node::Blockquote(quote) => flatten_into_quote(quote.content, out),
            Node::Table(Table { content }) | Node::TableRow(TableRow { content }) => {
                flatten_into_quote(content, out)
            }
            Node::TableHeaderCell(TableCell { content, .. })
            | Node::TableDataCell(TableCell { content, .. }) => flatten_into_quote(content, out),
            Node::Rule => {}
            other => out.push(other),
        }
    }
}
