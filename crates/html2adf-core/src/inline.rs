//! Text-run builder
//!
//! Walks inline HTML and emits ADF text nodes. Formatting tags push marks
//! onto the active [`MarkSet`]; adjacent runs with identical marks are
//! merged, whitespace is collapsed the way a browser renders it, and
//! zero-length runs are never emitted.

use crate::dom::{
    Child, attr, children, flattened_text, is_html_whitespace, is_non_content, tag,
};
use crate::error::ConvertError;
use adf_model::{Mark, MarkSet, Node, Text};
use scraper::ElementRef;

/// A piece of inline content: a sequence of runs, or an image that
/// interrupts the flow
pub(crate) enum InlinePiece<'a> {
    Runs(Vec<Node>),
    Image(ElementRef<'a>),
}

pub(crate) struct RunBuilder<'a> {
    pieces: Vec<InlinePiece<'a>>,
    runs: Vec<Text>,
    /// Images collected when the flow must not be split (headings)
    deferred: Vec<ElementRef<'a>>,
    /// Last emitted character was a space, or nothing was emitted yet
    after_space: bool,
    preformatted: bool,
    split_on_images: bool,
    max_depth: usize,
}

impl<'a> RunBuilder<'a> {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            pieces: Vec::new(),
            runs: Vec::new(),
            deferred: Vec::new(),
            after_space: true,
            preformatted: false,
            split_on_images: true,
            max_depth,
        }
    }

    /// Keep whitespace and line breaks verbatim
    pub(crate) fn preformatted(mut self) -> Self {
        self.preformatted = true;
        self
    }

    /// Collect images aside instead of splitting the text flow
    pub(crate) fn defer_images(mut self) -> Self {
        self.split_on_images = false;
        self
    }

    pub(crate) fn push_children(
        &mut self,
        nodes: impl IntoIterator<Item = Child<'a>>,
        marks: &MarkSet,
        depth: usize,
    ) -> Result<(), ConvertError> {
        if depth > self.max_depth {
            return Err(ConvertError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        for node in nodes {
            match node {
                Child::Text(text) => self.push_text(text, marks),
                Child::Element(element) => self.push_element(element, marks, depth)?,
            }
        }
        Ok(())
    }

    fn push_element(
        &mut self,
        element: ElementRef<'a>,
        marks: &MarkSet,
        depth: usize,
    ) -> Result<(), ConvertError> {
        if is_non_content(element) {
            return Ok(());
        }

        let inner = depth + 1;
        let mark = match tag(element) {
            "strong" | "b" => Some(Mark::Strong),
            "em" | "i" => Some(Mark::Emphasis),
            "u" => Some(Mark::Underline),
            "s" | "strike" | "del" => Some(Mark::Strike),
            "code" | "kbd" | "samp" | "var" | "tt" => Some(Mark::Code),
            "a" => return self.push_anchor(element, marks, inner),
            "br" => {
                self.push_text(if self.preformatted { "\n" } else { " " }, marks);
                return Ok(());
            }
            "img" => {
                self.push_image(element);
                return Ok(());
            }
            _ => None,
        };

        // Unrecognized tags are unwrapped
        match mark {
            Some(mark) => self.push_children(children(element), &marks.with(mark), inner),
            None => self.push_children(children(element), marks, inner),
        }
    }

    fn push_anchor(
        &mut self,
        element: ElementRef<'a>,
        marks: &MarkSet,
        depth: usize,
    ) -> Result<(), ConvertError> {
        let Some(href) = attr(element, "href") else {
            return self.push_children(children(element), marks, depth);
        };
        let marks = marks.with(Mark::link(href));
        if flattened_text(element).is_empty() && !contains_image(element) {
            self.push_text(href, &marks);
            return Ok(());
        }
        self.push_children(children(element), &marks, depth)
    }

    fn push_image(&mut self, element: ElementRef<'a>) {
        if self.split_on_images {
            self.end_segment();
            self.pieces.push(InlinePiece::Image(element));
        } else {
            self.deferred.push(element);
        }
    }

    fn push_text(&mut self, raw: &str, marks: &MarkSet) {
        let text = if self.preformatted {
            raw.to_string()
        } else {
            let mut collapsed = String::with_capacity(raw.len());
            for c in raw.chars() {
                if is_html_whitespace(c) {
                    if !self.after_space {
                        collapsed.push(' ');
                        self.after_space = true;
                    }
                } else {
                    collapsed.push(c);
                    self.after_space = false;
                }
            }
            collapsed
        };
        if text.is_empty() {
            return;
        }

        match self.runs.last_mut() {
            Some(last) if last.marks == *marks => last.text.push_str(&text),
            _ => self.runs.push(Text {
                text,
                marks: marks.clone(),
            }),
        }
    }

    /// Close the current run sequence, trimming its trailing whitespace
    fn end_segment(&mut self) {
        if let Some(last) = self.runs.last_mut() {
            let trimmed = if self.preformatted {
                last.text.trim_end_matches(['\n', '\r']).len()
            } else {
                last.text.trim_end_matches(' ').len()
            };
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                self.runs.pop();
            }
        }
        if !self.runs.is_empty() {
            let runs = std::mem::take(&mut self.runs)
                .into_iter()
                .map(Node::Text)
                .collect();
            self.pieces.push(InlinePiece::Runs(runs));
        }
        self.after_space = true;
    }

    /// Finish and return the pieces in source order
    pub(crate) fn finish(mut self) -> Vec<InlinePiece<'a>> {
        self.end_segment();
        let mut pieces = self.pieces;
        pieces.extend(self.deferred.into_iter().map(InlinePiece::Image));
        pieces
    }

    /// Finish and return all runs as one sequence, plus the deferred images
    pub(crate) fn finish_runs(mut self) -> (Vec<Node>, Vec<ElementRef<'a>>) {
        self.end_segment();
        let mut runs = Vec::new();
        for piece in self.pieces {
            match piece {
                InlinePiece::Runs(segment) => runs.extend(segment),
                InlinePiece::Image(image) => self.deferred.push(image),
            }
        }
        (runs, self.deferred)
    }
}

/// Text runs for the inline content of `element`. Images are skipped.
pub fn text_runs(element: ElementRef<'_>) -> Vec<Node> {
    let mut builder = RunBuilder::new(usize::MAX).defer_images();
    // An unbounded depth limit cannot be exceeded
    match builder.push_children(children(element), &MarkSet::new(), 0) {
        Ok(()) => builder.finish_runs().0,
        Err(_) => Vec::new(),
    }
}

fn contains_image(element: ElementRef<'_>) -> bool {
    element
        .descendants()
        .any(|node| node.value().as_element().is_some_and(|e| e.name() == "img"))
}
