//! Local collaborators for the media resolver
//!
//! - [`DirectoryUploader`] stores attachments as files instead of uploading
//!   them to a server
//! - [`DiagramDirectory`] finds pre-rendered diagrams by view key
//! - [`SourceFetcher`] reads images from HTTP, `file:` URLs, or paths
//!   relative to the input file

use html2adf_core::{
    BoxError, DiagramLookup, Fetcher, HttpFetcher, UploadedAttachment, Uploader, sanitize_filename,
};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Stores attachments under `<root>/<page id>/<filename>`
///
/// Only plain uploads are supported; no media identifiers are assigned.
pub struct DirectoryUploader {
    root: PathBuf,
}

impl DirectoryUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Uploader for DirectoryUploader {
    fn upload(
        &self,
        page_id: &str,
        filename: &str,
        bytes: &[u8],
        _mime_type: &str,
    ) -> Result<String, BoxError> {
        let page_dir = sanitize_filename(page_id);
        let dir = self.root.join(&page_dir);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(filename), bytes)?;
        Ok(format!("{}/{}", page_dir, filename))
    }

    fn upload_detailed(
        &self,
        _page_id: &str,
        _filename: &str,
        _bytes: &[u8],
        _mime_type: &str,
    ) -> Result<UploadedAttachment, BoxError> {
        Err("attachment directory does not assign media identifiers".into())
    }
}

/// Pre-rendered diagram images, named `<key>.png` or
/// `structurizr-<workspace>-<key>.png`
pub struct DiagramDirectory {
    dir: PathBuf,
}

impl DiagramDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DiagramLookup for DiagramDirectory {
    fn lookup(&self, view_key: &str) -> Option<PathBuf> {
        let exact = self.dir.join(format!("{}.png", view_key));
        if exact.is_file() {
            return Some(exact);
        }

        let suffix = format!("-{}.png", view_key);
        fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("structurizr-") && name.ends_with(&suffix))
            })
            // Several workspaces may render the same key; pick deterministically
            .min()
    }
}

/// Fetches image bytes for one input file
pub struct SourceFetcher<'a> {
    /// Directory that relative image paths are resolved against
    base_dir: &'a Path,
    http: Option<&'a HttpFetcher>,
}

impl<'a> SourceFetcher<'a> {
    pub fn new(base_dir: &'a Path, http: Option<&'a HttpFetcher>) -> Self {
        Self { base_dir, http }
    }
}

impl Fetcher for SourceFetcher<'_> {
    fn download(&self, src: &str) -> Result<Vec<u8>, BoxError> {
        match Url::parse(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => match self.http {
                Some(http) => http.download(src),
                None => Err("HTTP fetching is unavailable".into()),
            },
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| format!("Invalid file URL: {}", src))?;
                Ok(fs::read(path)?)
            }
            Ok(url) => Err(format!("Unsupported URL scheme: {}", url.scheme()).into()),
            Err(_) => {
                let relative = src.split(['?', '#']).next().unwrap_or(src);
                Ok(fs::read(self.base_dir.join(relative))?)
            }
        }
    }
}
