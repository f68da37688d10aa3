//! HTML to ADF conversion entry points
//!
//! [`html_to_adf`] converts a fragment into a typed [`Doc`]. [`convert_page`]
//! runs the full page pipeline: title extraction, conversion, serialization,
//! media centering, and the fallback document when conversion fails.

use crate::block::Converter;
use crate::error::ConvertError;
use crate::media::MediaResolver;
use crate::postprocess::center_media_single;
use crate::title::extract_title;
use adf_model::{ADF_VERSION, Doc};
use log::{debug, warn};
use scraper::Html;
use serde::Serialize;
use serde_json::{Value, json};

/// Default bound on element nesting
pub const DEFAULT_MAX_DEPTH: usize = 48;

/// Container used around each converted image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaContainer {
    /// `mediaGroup`, rendered as a file card
    #[default]
    Group,
    /// `mediaSingle`, rendered inline with a layout
    Single,
}

/// Options for HTML to ADF conversion
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    pub media_container: MediaContainer,
    /// Force `layout: "center"` on every `mediaSingle` after conversion
    pub center_media: bool,
    /// Deeper nesting aborts the conversion
    pub max_depth: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            media_container: MediaContainer::default(),
            center_media: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Where images are attached: a resolver and the page that owns the
/// attachments
pub struct MediaTarget<'r, 'a> {
    pub resolver: &'r mut MediaResolver<'a>,
    pub page_id: &'r str,
}

/// A converted page, ready to hand to the publishing client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBody {
    pub title: Option<String>,
    pub body: Value,
    /// The body is the fallback document because conversion failed
    #[serde(skip)]
    pub fallback: bool,
}

/// Convert an HTML fragment to an ADF document
///
/// Images are not attached; they become links to their source.
pub fn html_to_adf(html: &str) -> Result<Doc, ConvertError> {
    html_to_adf_with_options(html, &ConverterOptions::default(), None)
}

/// Convert an HTML fragment to an ADF document with options
pub fn html_to_adf_with_options(
    html: &str,
    options: &ConverterOptions,
    media: Option<MediaTarget<'_, '_>>,
) -> Result<Doc, ConvertError> {
    let fragment = Html::parse_fragment(html);
    let mut converter = Converter::new(options, media);
    let content = converter.convert_children(fragment.root_element())?;
    Ok(Doc::new(content))
}

/// Convert one page: split off its title, convert the rest, and
/// post-process the serialized document
///
/// Never fails. When conversion fails as a whole, the body is a minimal
/// document holding the raw HTML as text.
pub fn convert_page(
    html: &str,
    options: &ConverterOptions,
    media: Option<MediaTarget<'_, '_>>,
) -> PageBody {
    let split = extract_title(html);
    if let Some(title) = &split.title {
        debug!("Extracted page title: {}", title);
    }

    match convert_to_value(&split.content, options, media) {
        Ok(body) => PageBody {
            title: split.title,
            body,
            fallback: false,
        },
        Err(err) => {
            warn!("Conversion failed, using fallback document: {}", err);
            PageBody {
                title: split.title,
                body: fallback_document(html),
                fallback: true,
            }
        }
    }
}

fn convert_to_value(
    html: &str,
    options: &ConverterOptions,
    media: Option<MediaTarget<'_, '_>>,
) -> Result<Value, ConvertError> {
    let doc = html_to_adf_with_options(html, options, media)?;
    let mut value = serde_json::to_value(&doc)?;
    // The tree is built directly, so only alignment needs a second pass.
    // Marker splicing would turn page text into nodes.
    if options.center_media {
        let centered = center_media_single(&mut value);
        if centered > 0 {
            debug!("Centered {} media node(s)", centered);
        }
    }
    Ok(value)
}

/// Document with a single paragraph holding `raw` verbatim
pub fn fallback_document(raw: &str) -> Value {
    let paragraph = if raw.is_empty() {
        json!({"type": "paragraph", "content": []})
    } else {
        json!({"type": "paragraph", "content": [{"type": "text", "text": raw}]})
    };
    json!({"version": ADF_VERSION, "type": "doc", "content": [paragraph]})
}
