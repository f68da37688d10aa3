//! Error types for conversion and media resolution

use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by the media collaborators (fetcher, uploader)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort the conversion of a single page
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("HTML nesting exceeds the maximum depth of {limit}")]
    NestingTooDeep { limit: usize },

    #[error("Failed to serialize ADF document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that occur while turning an image reference into an attachment
///
/// These never abort a conversion: the converter degrades the image to a
/// textual placeholder and keeps going.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to download image from {url}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to upload {filename} to page {page_id}")]
    Upload {
        filename: String,
        page_id: String,
        #[source]
        source: BoxError,
    },

    #[error("Image reference has no source")]
    NoSource,

    #[error("No rendered diagram found for view key '{0}'")]
    DiagramNotFound(String),

    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
