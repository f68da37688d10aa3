//! Image resolution: download, upload as page attachment, and cache
//!
//! The resolver turns an `<img src>` value into an [`AttachmentRecord`]. It
//! delegates network and storage work to two collaborators, a [`Fetcher`]
//! that downloads bytes and an [`Uploader`] that stores them on a page.
//! Results are cached per source key so an image referenced several times
//! is uploaded once.

use crate::error::{BoxError, MediaError};
use adf_model::Node;
use log::{debug, info};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use url::Url;

/// `src` prefix for references to pre-rendered architecture diagrams
pub const LOCAL_DIAGRAM_PREFIX: &str = "local:diagram:";

/// Cache key prefix for images read from the local filesystem
const LOCAL_FILE_PREFIX: &str = "local:";

/// Downloads the bytes behind an image URL
pub trait Fetcher {
    fn download(&self, url: &str) -> Result<Vec<u8>, BoxError>;
}

/// Stores attachment bytes on a page
pub trait Uploader {
    /// Upload and return the attachment id
    fn upload(
        &self,
        page_id: &str,
        filename: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<String, BoxError>;

    /// Upload and return the identifiers needed for a media node.
    ///
    /// Implementations that cannot report media identifiers may return an
    /// error; the resolver then falls back to [`Uploader::upload`].
    fn upload_detailed(
        &self,
        page_id: &str,
        filename: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<UploadedAttachment, BoxError>;
}

/// Finds the rendered image for a diagram view key
pub trait DiagramLookup {
    fn lookup(&self, view_key: &str) -> Option<PathBuf>;
}

impl<F> DiagramLookup for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn lookup(&self, view_key: &str) -> Option<PathBuf> {
        self(view_key)
    }
}

/// What a detailed upload reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAttachment {
    pub attachment_id: String,
    /// Filename as stored on the page (the server may rename it)
    pub filename: String,
    pub file_id: Option<String>,
    pub collection_name: Option<String>,
}

/// The outcome of a successful image resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    /// Original URL, or `local:<absolute path>` for filesystem images
    pub source_key: String,
    pub resolved_filename: String,
    pub attachment_id: String,
    /// Media file identifier, when the upload reported one
    pub remote_file_id: Option<String>,
    /// Media collection name, when the upload reported one
    pub collection_name: Option<String>,
}

impl AttachmentRecord {
    /// Whether the upload reported both media identifiers
    pub fn has_media_ids(&self) -> bool {
        self.remote_file_id.is_some() && self.collection_name.is_some()
    }

    /// Build the `media` node referencing this attachment.
    ///
    /// Without media identifiers, an id is derived from the filename stem
    /// and the filename is used as the collection.
    pub fn media_node(&self, alt: Option<String>) -> Node {
        let id = self
            .remote_file_id
            .clone()
            .unwrap_or_else(|| media_id_from_filename(&self.resolved_filename));
        let collection = self
            .collection_name
            .clone()
            .unwrap_or_else(|| self.resolved_filename.clone());
        Node::media_file(id, collection, alt)
    }
}

/// Source key to attachment map
#[derive(Debug, Default)]
pub struct AttachmentCache {
    entries: HashMap<String, AttachmentRecord>,
}

impl AttachmentCache {
    pub fn get(&self, source_key: &str) -> Option<&AttachmentRecord> {
        self.entries.get(source_key)
    }

    pub fn insert(&mut self, record: AttachmentRecord) {
        self.entries.insert(record.source_key.clone(), record);
    }

    /// Whether a record from another source already uses `filename`
    pub fn filename_taken(&self, filename: &str, source_key: &str) -> bool {
        self.entries
            .values()
            .any(|record| record.resolved_filename == filename && record.source_key != source_key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves image references to page attachments
///
/// One resolver is meant to live for one publishing run. The cache is not
/// synchronized; give each worker thread its own resolver.
pub struct MediaResolver<'a> {
    fetcher: &'a dyn Fetcher,
    uploader: &'a dyn Uploader,
    diagrams: Option<&'a dyn DiagramLookup>,
    cache: AttachmentCache,
}

impl<'a> MediaResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, uploader: &'a dyn Uploader) -> Self {
        Self {
            fetcher,
            uploader,
            diagrams: None,
            cache: AttachmentCache::default(),
        }
    }

    /// Enable `local:diagram:<key>` references
    pub fn with_diagram_lookup(mut self, diagrams: &'a dyn DiagramLookup) -> Self {
        self.diagrams = Some(diagrams);
        self
    }

    /// Resolve an `<img src>` value for the given page
    pub fn resolve(&mut self, src: &str, page_id: &str) -> Result<AttachmentRecord, MediaError> {
        let src = src.trim();
        if src.is_empty() {
            return Err(MediaError::NoSource);
        }
        if let Some(view_key) = src.strip_prefix(LOCAL_DIAGRAM_PREFIX) {
            let path = self
                .diagrams
                .and_then(|diagrams| diagrams.lookup(view_key))
                .ok_or_else(|| MediaError::DiagramNotFound(view_key.to_string()))?;
            return self.resolve_local_file(&path, page_id);
        }
        self.resolve_url(src, page_id)
    }

    /// Download a remote image and upload it
    pub fn resolve_url(&mut self, url: &str, page_id: &str) -> Result<AttachmentRecord, MediaError> {
        if let Some(record) = self.cache.get(url) {
            debug!("Attachment cache hit for {}", url);
            return Ok(record.clone());
        }

        let filename = filename_from_url(url);
        debug!("Downloading {} as {}", url, filename);
        let bytes = self
            .fetcher
            .download(url)
            .map_err(|source| MediaError::Fetch {
                url: url.to_string(),
                source,
            })?;

        self.upload(url.to_string(), &filename, &bytes, page_id)
    }

    /// Upload an image from the local filesystem
    pub fn resolve_local_file(
        &mut self,
        path: &Path,
        page_id: &str,
    ) -> Result<AttachmentRecord, MediaError> {
        let absolute = std::path::absolute(path).map_err(|source| MediaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = format!("{}{}", LOCAL_FILE_PREFIX, absolute.display());
        if let Some(record) = self.cache.get(&key) {
            debug!("Attachment cache hit for {}", absolute.display());
            return Ok(record.clone());
        }

        let name = absolute.file_name().and_then(|n| n.to_str());
        let filename = filename_or_synthesized(name, &key);
        let bytes = std::fs::read(&absolute).map_err(|source| MediaError::Io {
            path: absolute.clone(),
            source,
        })?;

        self.upload(key, &filename, &bytes, page_id)
    }

    fn upload(
        &mut self,
        source_key: String,
        filename: &str,
        bytes: &[u8],
        page_id: &str,
    ) -> Result<AttachmentRecord, MediaError> {
        let unique;
        let filename = if self.cache.filename_taken(filename, &source_key) {
            unique = disambiguated_filename(filename, &source_key);
            debug!("{} is already attached, uploading as {}", filename, unique);
            unique.as_str()
        } else {
            filename
        };
        let mime_type = mime_type_for(filename);

        let record = match self
            .uploader
            .upload_detailed(page_id, filename, bytes, mime_type)
        {
            Ok(uploaded) => AttachmentRecord {
                source_key,
                resolved_filename: if uploaded.filename.is_empty() {
                    filename.to_string()
                } else {
                    uploaded.filename
                },
                attachment_id: uploaded.attachment_id,
                remote_file_id: uploaded.file_id,
                collection_name: uploaded.collection_name,
            },
            Err(err) => {
                debug!(
                    "Detailed upload of {} failed ({}), retrying as plain upload",
                    filename, err
                );
                let attachment_id = self
                    .uploader
                    .upload(page_id, filename, bytes, mime_type)
                    .map_err(|source| MediaError::Upload {
                        filename: filename.to_string(),
                        page_id: page_id.to_string(),
                        source,
                    })?;
                AttachmentRecord {
                    source_key,
                    resolved_filename: filename.to_string(),
                    attachment_id,
                    remote_file_id: None,
                    collection_name: None,
                }
            }
        };

        info!(
            "Uploaded {} to page {} (attachment {})",
            record.resolved_filename, page_id, record.attachment_id
        );
        self.cache.insert(record.clone());
        Ok(record)
    }

    /// Cached record for a source key, if any
    pub fn get(&self, source_key: &str) -> Option<&AttachmentRecord> {
        self.cache.get(source_key)
    }

    pub fn cache(&self) -> &AttachmentCache {
        &self.cache
    }

    /// Forget every cached attachment
    pub fn reset(&mut self) {
        self.cache.clear();
    }
}

/// Attachment filename for an image URL
///
/// Uses the last path segment when it looks like a filename, otherwise
/// synthesizes `image_<hash>.png`.
pub fn filename_from_url(url: &str) -> String {
    let last_segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        // Relative reference: strip query and fragment by hand
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };
    filename_or_synthesized(last_segment.as_deref(), url)
}

fn filename_or_synthesized(candidate: Option<&str>, source: &str) -> String {
    match candidate {
        Some(name) if name.contains('.') && !name.starts_with('.') => sanitize_filename(name),
        _ => synthesized_filename(source),
    }
}

fn synthesized_filename(source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format!("image_{:016x}.png", hasher.finish())
}

/// `name.ext` -> `name_<hash>.ext`, hashing the source so the result is stable
fn disambiguated_filename(filename: &str, source: &str) -> String {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    let suffix = format!("{:08x}", hasher.finish() as u32);
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", filename, suffix),
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// MIME type guessed from the filename extension
pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

/// Media id derived from a filename stem
fn media_id_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
