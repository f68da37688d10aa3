//! html2adf-core: Core library for converting HTML to Atlassian Document Format
//!
//! This crate provides:
//! - Page title extraction (first non-blank top-level `<h1>`)
//! - Block and inline conversion of HTML to ADF nodes
//! - Image resolution to page attachments, with a per-run cache
//! - Post-processing passes over serialized ADF (marker splicing, media centering)
//!
//! ## Example
//!
//! ```rust
//! use html2adf_core::{ConverterOptions, convert_page};
//!
//! let page = convert_page("<h1>Guide</h1><p>Hello <b>world</b></p>", &ConverterOptions::default(), None);
//! assert_eq!(page.title.as_deref(), Some("Guide"));
//! assert_eq!(page.body["content"][0]["type"], "paragraph");
//! ```

mod block;
pub mod convert;
mod dom;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod inline;
pub mod media;
pub mod postprocess;
mod table;
pub mod title;

pub use convert::{
    ConverterOptions, DEFAULT_MAX_DEPTH, MediaContainer, MediaTarget, PageBody, convert_page,
    fallback_document, html_to_adf, html_to_adf_with_options,
};
pub use error::{BoxError, ConvertError, MediaError};
#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use inline::text_runs;
pub use media::{
    AttachmentCache, AttachmentRecord, DiagramLookup, Fetcher, LOCAL_DIAGRAM_PREFIX, MediaResolver,
    UploadedAttachment, Uploader, filename_from_url, mime_type_for, sanitize_filename,
};
pub use postprocess::{PostProcessReport, center_media_single, post_process, splice_markers};
pub use title::{TitleSplit, extract_title};
