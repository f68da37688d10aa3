//! Integration tests for the html2adf binary

use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn html2adf() -> Command {
    Command::new(env!("CARGO_BIN_EXE_html2adf"))
}

fn run(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("Failed to run html2adf");
    assert!(
        output.status.success(),
        "html2adf failed with status {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("Failed to read output file");
    serde_json::from_str(&content).expect("Output is not JSON")
}

/// Run html2adf on a fixture file and return the parsed output
fn convert_fixture(name: &str, args: &[&str]) -> Value {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join(format!("{}.adf.json", name));

    run(html2adf()
        .arg(fixtures_dir().join(format!("{}.html", name)))
        .arg("-o")
        .arg(&output)
        .arg("-q")
        .args(args));

    read_json(&output)
}

fn types(nodes: &Value) -> Vec<&str> {
    nodes
        .as_array()
        .map(|nodes| nodes.iter().filter_map(|n| n["type"].as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn test_simple_conversion() {
    let output = convert_fixture("simple", &[]);

    assert_eq!(output["title"], "Getting Started");
    assert_eq!(output["body"]["version"], 1);
    assert_eq!(output["body"]["type"], "doc");
    assert_eq!(
        types(&output["body"]["content"]),
        ["paragraph", "bulletList", "rule"]
    );

    let runs = output["body"]["content"][0]["content"].as_array().unwrap();
    assert!(runs.contains(&json!({
        "type": "text",
        "text": "html2adf",
        "marks": [{"type": "strong"}]
    })));
    assert!(runs.contains(&json!({
        "type": "text",
        "text": "cargo install",
        "marks": [{"type": "code"}]
    })));

    let items = &output["body"]["content"][1]["content"];
    assert_eq!(types(items), ["listItem", "listItem"]);
    assert_eq!(items[1]["content"][0]["content"][0]["text"], "Small");
}

#[test]
fn test_table_conversion() {
    let output = convert_fixture("tables", &[]);

    assert_eq!(output["title"], "Options");
    let table = &output["body"]["content"][0];
    assert_eq!(table["type"], "table");
    assert_eq!(types(&table["content"][0]["content"]), ["tableHeader", "tableHeader"]);
    assert_eq!(types(&table["content"][1]["content"]), ["tableCell", "tableCell"]);

    let spanned = &table["content"][2]["content"][0];
    assert_eq!(spanned["attrs"]["colspan"], 2);
    assert_eq!(
        spanned["content"][0]["content"][0],
        json!({"type": "text", "text": "More to come", "marks": [{"type": "em"}]})
    );
}

#[test]
fn test_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.html");
    fs::write(&input, "<p>Hello</p>").unwrap();

    let output = run(html2adf().arg(&input));
    let expected = dir.path().join("page.adf.json");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        expected.display().to_string()
    );

    let page = read_json(&expected);
    assert_eq!(page["title"], Value::Null);
    assert_eq!(page["body"]["content"][0]["content"][0]["text"], "Hello");
}

#[test]
fn test_compact_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    run(html2adf()
        .arg(fixtures_dir().join("simple.html"))
        .arg("-o")
        .arg(&output)
        .arg("--compact"));

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.trim_end().lines().count(), 1);
}

#[test]
fn test_images_degrade_without_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("page.html");
    fs::write(
        &input,
        r#"<p>Logo</p><img src="logo.png" alt="Company logo">"#,
    )
    .unwrap();

    run(html2adf().arg(&input).arg("-q"));

    let page = read_json(&dir.path().join("page.adf.json"));
    assert_eq!(
        page["body"]["content"][1],
        json!({
            "type": "paragraph",
            "content": [{
                "type": "text",
                "text": "Company logo",
                "marks": [{"type": "link", "attrs": {"href": "logo.png"}}]
            }]
        })
    );
}

#[test]
fn test_images_attached_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("img")).unwrap();
    fs::write(dir.path().join("img/logo.png"), b"\x89PNG").unwrap();
    let input = dir.path().join("guide.html");
    fs::write(
        &input,
        r#"<h1>Guide</h1>
<p>Before <img src="img/logo.png" alt="Logo"> after</p>
<img src="img/logo.png">
<img src="img/missing.png" alt="Missing">"#,
    )
    .unwrap();
    let attachments = dir.path().join("attachments");

    run(html2adf()
        .arg(&input)
        .arg("-q")
        .arg("--attachments-dir")
        .arg(&attachments)
        .arg("--media-container")
        .arg("single"));

    let page = read_json(&dir.path().join("guide.adf.json"));
    let content = &page["body"]["content"];
    assert_eq!(
        types(content),
        ["paragraph", "mediaSingle", "paragraph", "mediaSingle", "paragraph"]
    );

    let first = &content[1];
    assert_eq!(first["attrs"]["layout"], "center");
    assert_eq!(first["content"][0]["attrs"]["collection"], "logo.png");
    assert_eq!(first["content"][0]["attrs"]["alt"], "Logo");
    // Same source twice is one attachment
    assert_eq!(
        content[3]["content"][0]["attrs"]["id"],
        first["content"][0]["attrs"]["id"]
    );

    assert_eq!(content[4]["content"][0]["text"], "Missing");
    assert_eq!(
        fs::read(attachments.join("guide/logo.png")).unwrap(),
        b"\x89PNG"
    );
}

#[test]
fn test_same_filename_in_different_folders() {
    let dir = tempfile::tempdir().unwrap();
    for (folder, bytes) in [("a", b"first"), ("b", b"other")] {
        fs::create_dir(dir.path().join(folder)).unwrap();
        fs::write(dir.path().join(folder).join("logo.png"), bytes).unwrap();
    }
    let input = dir.path().join("page.html");
    fs::write(&input, r#"<img src="a/logo.png"><img src="b/logo.png">"#).unwrap();
    let attachments = dir.path().join("att");

    run(html2adf()
        .arg(&input)
        .arg("-q")
        .arg("--attachments-dir")
        .arg(&attachments));

    let page = read_json(&dir.path().join("page.adf.json"));
    let content = &page["body"]["content"];
    assert_eq!(types(content), ["mediaGroup", "mediaGroup"]);
    let first = &content[0]["content"][0]["attrs"];
    let second = &content[1]["content"][0]["attrs"];
    assert_eq!(first["collection"], "logo.png");
    assert_ne!(first["id"], second["id"]);
    assert_ne!(first["collection"], second["collection"]);

    assert_eq!(fs::read(attachments.join("page/logo.png")).unwrap(), b"first");
    let stored = second["collection"].as_str().unwrap();
    assert_eq!(fs::read(attachments.join("page").join(stored)).unwrap(), b"other");
}

#[test]
fn test_diagram_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let diagrams = dir.path().join("diagrams");
    fs::create_dir(&diagrams).unwrap();
    fs::write(diagrams.join("structurizr-1-SystemContext.png"), b"png").unwrap();
    let input = dir.path().join("arch.html");
    fs::write(
        &input,
        r#"<img src="local:diagram:SystemContext"><img src="local:diagram:Unknown">"#,
    )
    .unwrap();

    run(html2adf()
        .arg(&input)
        .arg("-q")
        .arg("--page-id")
        .arg("4242")
        .arg("--attachments-dir")
        .arg(dir.path().join("att"))
        .arg("--diagrams-dir")
        .arg(&diagrams));

    let page = read_json(&dir.path().join("arch.adf.json"));
    let content = &page["body"]["content"];
    assert_eq!(types(content), ["mediaGroup", "paragraph"]);
    assert_eq!(content[1]["content"][0]["text"], "Diagram: Unknown");
    assert!(
        dir.path()
            .join("att/4242/structurizr-1-SystemContext.png")
            .is_file()
    );
}

#[test]
fn test_config_file_in_input_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("_html2adf.toml"),
        "[output]\npretty = false\nextension = \"json\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("page.html"), "<p>Configured</p>").unwrap();

    run(html2adf().arg(dir.path().join("page.html")).arg("-q"));

    let output = dir.path().join("page.json");
    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.trim_end().lines().count(), 1);
    assert_eq!(
        read_json(&output)["body"]["content"][0]["content"][0]["text"],
        "Configured"
    );
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("_html2adf.toml"), "[media]\ncontainer = 3\n").unwrap();
    fs::write(dir.path().join("page.html"), "<p>x</p>").unwrap();

    let output = html2adf()
        .arg(dir.path().join("page.html"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to parse config file"));
}

#[test]
fn test_too_deep_writes_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let html = format!(
        "<h1>Deep</h1>{}text{}",
        "<div>".repeat(100),
        "</div>".repeat(100)
    );
    let input = dir.path().join("deep.html");
    fs::write(&input, &html).unwrap();

    run(html2adf().arg(&input).arg("-q"));

    let page = read_json(&dir.path().join("deep.adf.json"));
    assert_eq!(page["title"], "Deep");
    assert_eq!(
        page["body"],
        json!({
            "version": 1,
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": html}]}]
        })
    );
}

#[test]
fn test_directory_conversion() {
    let output_dir = tempfile::tempdir().unwrap();

    run(html2adf()
        .arg(fixtures_dir())
        .arg("-o")
        .arg(output_dir.path())
        .arg("-q"));

    let mut files: Vec<_> = fs::read_dir(output_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    insta::assert_snapshot!(files.join("\n"), @r"
    simple.adf.json
    tables.adf.json
    ");
}

#[test]
fn test_directory_conversion_recursive() {
    let output_dir = tempfile::tempdir().unwrap();

    run(html2adf()
        .arg(fixtures_dir())
        .arg("-o")
        .arg(output_dir.path())
        .arg("-r")
        .arg("-j2")
        .arg("-q"));

    let nested = read_json(&output_dir.path().join("sub/nested.adf.json"));
    assert_eq!(nested["title"], "Nested");
    let quote = &nested["body"]["content"][0];
    assert_eq!(quote["type"], "blockquote");
    assert_eq!(types(&quote["content"]), ["paragraph", "paragraph"]);
    assert_eq!(quote["content"][0]["content"][0]["text"], "Note");
}

#[test]
fn test_missing_input_fails() {
    let output = html2adf().arg("does/not/exist.html").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Input path does not exist"));
}

#[test]
fn test_init_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("_html2adf.toml");

    run(html2adf().arg("--init-config").arg(&path).arg("-q"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("#:schema "));
    assert!(content.contains("[output]"));
    assert!(content.contains("container = \"group\""));

    // Refuses to overwrite
    let output = html2adf().arg("--init-config").arg(&path).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_print_schema() {
    let output = run(html2adf().arg("--print-schema"));
    let schema: Value = serde_json::from_slice(&output.stdout).expect("Schema is not JSON");
    assert_eq!(schema["title"], "Config");
    assert!(schema["properties"]["media"].is_object());
}
