//! Configuration file support for html2adf CLI
//!
//! Loads settings from `_html2adf.toml` configuration file.

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "_html2adf.toml";

/// Schema URL for the configuration file
pub const SCHEMA_URL: &str = "https://raw.githubusercontent.com/html2adf/html2adf/main/crates/html2adf-cli/schema/html2adf.schema.json";

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Output file configuration
    #[serde(skip_serializing_if = "OutputConfig::is_empty")]
    pub output: OutputConfig,
    /// Image and attachment configuration
    #[serde(skip_serializing_if = "MediaConfig::is_empty")]
    pub media: MediaConfig,
}

/// Output file configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the JSON output (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<bool>,
    /// Extension of output files, without the leading dot (default: "adf.json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl OutputConfig {
    fn is_empty(&self) -> bool {
        self.pretty.is_none() && self.extension.is_none()
    }
}

/// Container placed around each image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// mediaGroup (file card)
    Group,
    /// mediaSingle (inline image)
    Single,
}

/// Image and attachment configuration
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct MediaConfig {
    /// Media container: "group" or "single" (default: "group")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerKind>,
    /// Force center layout on single media (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<bool>,
    /// Page that owns uploaded attachments (default: the input file stem)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// Directory where attachments are stored. Images are only attached when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments_dir: Option<PathBuf>,
    /// Directory of pre-rendered diagrams for `local:diagram:<key>` images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagrams_dir: Option<PathBuf>,
    /// Timeout for image downloads in seconds (default: 30)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,
}

impl MediaConfig {
    fn is_empty(&self) -> bool {
        self.container.is_none()
            && self.center.is_none()
            && self.page_id.is_none()
            && self.attachments_dir.is_none()
            && self.diagrams_dir.is_none()
            && self.fetch_timeout_secs.is_none()
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Try to load configuration from a directory (looks for `_html2adf.toml`)
    ///
    /// Returns `Ok(None)` if the config file doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolve relative directories against the directory holding the
    /// config file
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        for dir in [&mut self.media.attachments_dir, &mut self.media.diagrams_dir]
            .into_iter()
            .flatten()
        {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    /// Generate JSON schema for the configuration
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Generate JSON schema as a string
    pub fn json_schema_string() -> Result<String> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema).context("Failed to serialize JSON schema")
    }

    /// Serialize configuration to TOML string with schema directive
    pub fn to_toml_with_schema(&self) -> Result<String> {
        let toml_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        Ok(format!("#:schema {}\n\n{}", SCHEMA_URL, toml_content))
    }

    /// Create a sample configuration for the init command
    pub fn sample() -> Self {
        Config {
            output: OutputConfig {
                pretty: Some(true),
                extension: Some("adf.json".to_string()),
            },
            media: MediaConfig {
                container: Some(ContainerKind::Group),
                center: Some(true),
                page_id: None, // defaults to the file stem
                attachments_dir: Some(PathBuf::from("attachments")),
                diagrams_dir: None,
                fetch_timeout_secs: Some(30),
            },
        }
    }
}
