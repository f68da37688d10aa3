//! html2adf: CLI tool to convert HTML documentation to Atlassian Document Format

mod attachments;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use attachments::{DiagramDirectory, DirectoryUploader, SourceFetcher};
use config::{CONFIG_FILE_NAME, Config, ContainerKind};
use html2adf_core::http::DEFAULT_TIMEOUT;
use html2adf_core::{
    ConverterOptions, HttpFetcher, MediaContainer, MediaResolver, MediaTarget, PageBody,
    convert_page,
};

const DEFAULT_EXTENSION: &str = "adf.json";

#[derive(Parser, Debug)]
#[command(name = "html2adf")]
#[command(about = "Convert HTML documentation to Atlassian Document Format")]
#[command(version)]
#[command(after_help = "Examples:
  html2adf page.html                          # Convert single file to page.adf.json
  html2adf page.html -o body.json             # Convert to specific output file
  html2adf site/ -o adf/ -r                   # Convert directory recursively
  html2adf site/ -o adf/ -j4                  # Use 4 parallel jobs
  html2adf page.html --attachments-dir att/   # Store images as page attachments
  html2adf --init-config _html2adf.toml       # Write a sample config file")]
struct Cli {
    /// Input HTML file or directory
    #[arg(required_unless_present_any = ["print_schema", "init_config"])]
    input: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel jobs (defaults to number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Process directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Config file (defaults to _html2adf.toml next to the input)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page that owns uploaded attachments (defaults to the input file stem)
    #[arg(long)]
    page_id: Option<String>,

    /// Store images as attachments under this directory
    #[arg(long)]
    attachments_dir: Option<PathBuf>,

    /// Directory of pre-rendered diagrams for local:diagram:<key> images
    #[arg(long)]
    diagrams_dir: Option<PathBuf>,

    /// Container placed around each image
    #[arg(long, value_enum)]
    media_container: Option<ContainerKind>,

    /// Keep the layout of mediaSingle nodes instead of centering them
    #[arg(long)]
    no_center_media: bool,

    /// Write compact JSON instead of pretty-printed JSON
    #[arg(long)]
    compact: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the JSON schema of the config file and exit
    #[arg(long)]
    print_schema: bool,

    /// Write a sample config file to this path and exit
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = CONFIG_FILE_NAME)]
    init_config: Option<PathBuf>,
}

/// Effective settings after merging the config file with CLI flags
struct Settings {
    options: ConverterOptions,
    pretty: bool,
    extension: String,
    page_id: Option<String>,
    attachments_dir: Option<PathBuf>,
    diagrams_dir: Option<PathBuf>,
    fetch_timeout: Duration,
    quiet: bool,
}

impl Settings {
    fn resolve(cli: &Cli, config: Config) -> Self {
        let container = cli
            .media_container
            .or(config.media.container)
            .unwrap_or(ContainerKind::Group);

        Self {
            options: ConverterOptions {
                media_container: match container {
                    ContainerKind::Group => MediaContainer::Group,
                    ContainerKind::Single => MediaContainer::Single,
                },
                center_media: !cli.no_center_media && config.media.center.unwrap_or(true),
                ..ConverterOptions::default()
            },
            pretty: !cli.compact && config.output.pretty.unwrap_or(true),
            extension: config
                .output
                .extension
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            page_id: cli.page_id.clone().or(config.media.page_id),
            attachments_dir: cli.attachments_dir.clone().or(config.media.attachments_dir),
            diagrams_dir: cli.diagrams_dir.clone().or(config.media.diagrams_dir),
            fetch_timeout: config
                .media
                .fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
            quiet: cli.quiet,
        }
    }

    /// HTTP client shared by every file; only needed when images are attached
    fn http_fetcher(&self) -> Option<HttpFetcher> {
        self.attachments_dir.as_ref()?;
        match HttpFetcher::new(self.fetch_timeout) {
            Ok(fetcher) => Some(fetcher),
            Err(e) => {
                warn!("HTTP fetching disabled: {}", e);
                None
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.print_schema {
        println!("{}", Config::json_schema_string()?);
        return Ok(());
    }

    if let Some(path) = &cli.init_config {
        return init_config(path, cli.quiet);
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("No input path given");
    };

    let config = load_config(&cli, input)?;
    let settings = Settings::resolve(&cli, config);
    let http = settings.http_fetcher();

    if input.is_file() {
        convert_file(input, cli.output.as_deref(), &settings, http.as_ref())?;
    } else if input.is_dir() {
        convert_directory(
            input,
            cli.output.as_deref(),
            cli.recursive,
            cli.jobs,
            &settings,
            http.as_ref(),
        )?;
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Load `--config`, or `_html2adf.toml` from the input directory
fn load_config(cli: &Cli, input: &Path) -> Result<Config> {
    if let Some(path) = &cli.config {
        let base = path.parent().unwrap_or(Path::new(""));
        return Ok(Config::load(path)?.with_base_dir(base));
    }

    let dir = if input.is_dir() {
        input
    } else {
        input.parent().unwrap_or(Path::new(""))
    };
    let search_dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    match Config::load_from_dir(search_dir)? {
        Some(config) => {
            info!(
                "Using config: {}",
                search_dir.join(CONFIG_FILE_NAME).display()
            );
            Ok(config.with_base_dir(search_dir))
        }
        None => Ok(Config::default()),
    }
}

fn init_config(path: &Path, quiet: bool) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }

    let content = Config::sample().to_toml_with_schema()?;
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))?;

    if !quiet {
        println!("{}", path.display());
    }
    Ok(())
}

/// Convert a single HTML file to ADF JSON
fn convert_file(
    input: &Path,
    output: Option<&Path>,
    settings: &Settings,
    http: Option<&HttpFetcher>,
) -> Result<()> {
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => output_path_for(input, &settings.extension),
    };

    info!(
        "Converting: {} -> {}",
        input.display(),
        output_path.display()
    );

    convert_file_inner(input, &output_path, settings, http)?;

    if !settings.quiet {
        println!("{}", output_path.display());
    }

    Ok(())
}

/// Convert a directory of HTML files
fn convert_directory(
    input: &Path,
    output: Option<&Path>,
    recursive: bool,
    jobs: Option<usize>,
    settings: &Settings,
    http: Option<&HttpFetcher>,
) -> Result<()> {
    let output_dir = output.unwrap_or(input);

    let files = collect_html_files(input, recursive)?;

    if files.is_empty() {
        if !settings.quiet {
            eprintln!("No .html files found in {}", input.display());
        }
        return Ok(());
    }

    let total = files.len();
    info!("Found {} .html files", total);

    if let Some(n) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let success = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    // Every file gets its own media resolver, so nothing is shared but the
    // HTTP client
    let errors: Vec<_> = files
        .par_iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(input).unwrap_or(file);
            let output_file = output_path_for(&output_dir.join(relative), &settings.extension);

            match convert_file_inner(file, &output_file, settings, http) {
                Ok(()) => {
                    success.fetch_add(1, Ordering::Relaxed);
                    if !settings.quiet {
                        println!("{}", output_file.display());
                    }
                    None
                }
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    Some((file.clone(), e))
                }
            }
        })
        .collect();

    for (file, e) in &errors {
        eprintln!("Error converting {}: {:#}", file.display(), e);
    }

    let success_count = success.load(Ordering::Relaxed);
    let failed_count = failed.load(Ordering::Relaxed);

    if !settings.quiet {
        eprintln!("Converted {} files, {} failed", success_count, failed_count);
    }

    if failed_count > 0 {
        anyhow::bail!("{} files failed to convert", failed_count);
    }

    Ok(())
}

/// Inner conversion function that doesn't print (for parallel use)
fn convert_file_inner(
    input: &Path,
    output: &Path,
    settings: &Settings,
    http: Option<&HttpFetcher>,
) -> Result<()> {
    let html = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;

    let page = convert_html(&html, input, settings, http);
    if page.fallback {
        warn!(
            "{}: conversion failed, wrote the raw HTML as a single paragraph",
            input.display()
        );
    }

    let json = if settings.pretty {
        serde_json::to_string_pretty(&page)
    } else {
        serde_json::to_string(&page)
    }
    .context("Failed to serialize ADF document")?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(output, json + "\n")
        .with_context(|| format!("Failed to write: {}", output.display()))?;

    Ok(())
}

/// Run the page pipeline, attaching images when an attachment directory is set
fn convert_html(
    html: &str,
    input: &Path,
    settings: &Settings,
    http: Option<&HttpFetcher>,
) -> PageBody {
    let Some(attachments_dir) = &settings.attachments_dir else {
        return convert_page(html, &settings.options, None);
    };

    let base_dir = input.parent().unwrap_or(Path::new(""));
    let fetcher = SourceFetcher::new(base_dir, http);
    let uploader = DirectoryUploader::new(attachments_dir);
    let diagrams = settings
        .diagrams_dir
        .as_ref()
        .map(DiagramDirectory::new);

    let mut resolver = MediaResolver::new(&fetcher, &uploader);
    if let Some(diagrams) = &diagrams {
        resolver = resolver.with_diagram_lookup(diagrams);
    }

    let page_id = settings
        .page_id
        .clone()
        .unwrap_or_else(|| file_stem(input));

    let page = convert_page(
        html,
        &settings.options,
        Some(MediaTarget {
            resolver: &mut resolver,
            page_id: &page_id,
        }),
    );
    debug!(
        "{}: {} image(s) attached to page {}",
        input.display(),
        resolver.cache().len(),
        page_id
    );
    page
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `dir/page.html` -> `dir/page.<extension>`
fn output_path_for(input: &Path, extension: &str) -> PathBuf {
    input.with_file_name(format!("{}.{}", file_stem(input), extension))
}

/// Collect all .html and .htm files in a directory
fn collect_html_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension()
                && (ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_html_files(&path, recursive)?);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("site/guide.html"), "adf.json"),
            PathBuf::from("site/guide.adf.json")
        );
        assert_eq!(
            output_path_for(Path::new("index.htm"), "json"),
            PathBuf::from("index.json")
        );
    }

    #[test]
    fn test_collect_html_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.html"), "").unwrap();
        fs::write(dir.path().join("a.HTM"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.html"), "").unwrap();

        let flat = collect_html_files(dir.path(), false).unwrap();
        assert_eq!(
            flat,
            vec![dir.path().join("a.HTM"), dir.path().join("b.html")]
        );

        let deep = collect_html_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("sub/c.html")));
    }

    #[test]
    fn test_settings_cli_overrides_config() {
        let cli = Cli::parse_from([
            "html2adf",
            "page.html",
            "--media-container",
            "single",
            "--compact",
            "--page-id",
            "99",
        ]);
        let config: Config = toml::from_str(
            r#"
            [output]
            pretty = true
            extension = "json"

            [media]
            container = "group"
            center = false
            page_id = "12"
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(&cli, config);
        assert_eq!(settings.options.media_container, MediaContainer::Single);
        assert!(!settings.options.center_media);
        assert!(!settings.pretty);
        assert_eq!(settings.extension, "json");
        assert_eq!(settings.page_id.as_deref(), Some("99"));
        assert!(settings.attachments_dir.is_none());
        assert_eq!(settings.fetch_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_settings_defaults() {
        let cli = Cli::parse_from(["html2adf", "page.html"]);
        let settings = Settings::resolve(&cli, Config::default());
        assert_eq!(settings.options.media_container, MediaContainer::Group);
        assert!(settings.options.center_media);
        assert!(settings.pretty);
        assert_eq!(settings.extension, DEFAULT_EXTENSION);
        assert!(settings.http_fetcher().is_none());
    }

    #[test]
    fn test_input_required_unless_schema() {
        assert!(Cli::try_parse_from(["html2adf"]).is_err());
        assert!(Cli::try_parse_from(["html2adf", "--print-schema"]).is_ok());
    }

    #[test]
    fn test_convert_html_with_attachments() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logo.png"), b"png").unwrap();
        let input = dir.path().join("guide.html");
        let attachments = dir.path().join("att");

        let cli = Cli::parse_from(["html2adf", "guide.html"]);
        let mut settings = Settings::resolve(&cli, Config::default());
        settings.attachments_dir = Some(attachments.clone());

        let page = convert_html(
            r#"<h1>Guide</h1><p>Logo <img src="logo.png" alt="Logo"></p>"#,
            &input,
            &settings,
            None,
        );

        assert_eq!(page.title.as_deref(), Some("Guide"));
        assert_eq!(page.body["content"][1]["type"], "mediaGroup");
        let media = &page.body["content"][1]["content"][0]["attrs"];
        assert_eq!(media["collection"], "logo.png");
        assert_eq!(fs::read(attachments.join("guide/logo.png")).unwrap(), b"png");
    }
}
