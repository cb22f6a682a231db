/// Integration test suite for the `docx-live-reload` binary.
///
/// All tests invoke the compiled binary via subprocess. The
/// `CARGO_BIN_EXE_docx-live-reload` environment variable is set by Cargo during
/// `cargo test` to point to the compiled binary for the current profile.
///
/// Child processes get a closed stdin, which the console treats as `quit`, so
/// a full run stops on its own after the first unpack.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docx-live-reload"))
}

/// Run the binary and assert it exits successfully. Returns (stdout, stderr).
fn run_success(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to invoke docx-live-reload binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    (stdout, stderr)
}

/// Run the binary and assert it exits with a non-zero status. Returns stderr.
fn run_failure(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke docx-live-reload binary");
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstderr: {}",
        args,
        stderr
    );
    stderr
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:styleId="Normal"/></w:styles>"#;

fn write_docx(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", DOCUMENT),
        ("word/styles.xml", STYLES),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

#[test]
fn test_version() {
    let (stdout, _) = run_success(&["--version"]);
    assert!(stdout.starts_with("docx-live-reload "), "stdout: {stdout}");
}

#[test]
fn test_help_lists_options() {
    let (stdout, _) = run_success(&["--help"]);
    for flag in ["--port", "--no-server", "--editor"] {
        assert!(stdout.contains(flag), "help should mention {flag}\n{stdout}");
    }
}

#[test]
fn test_wrong_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "hi").unwrap();
    let stderr = run_failure(&[notes.to_str().unwrap()]);
    assert!(stderr.contains("File must be of the Docx format"), "stderr: {stderr}");
}

#[test]
fn test_missing_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.docx");
    let stderr = run_failure(&[missing.to_str().unwrap()]);
    assert!(stderr.contains("File does not exist"), "stderr: {stderr}");
}

#[test]
fn test_missing_argument_is_rejected() {
    run_failure(&[]);
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn test_run_unpacks_and_exits_on_closed_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("report.docx");
    write_docx(&docx);
    std::fs::write(
        dir.path().join("docx-live-reload.toml"),
        "[question_file]\nenabled = false\n",
    )
    .unwrap();

    let (stdout, _) = run_success(&[
        docx.to_str().unwrap(),
        "--no-server",
        "--editor",
        "tail -f",
    ]);
    assert!(stdout.contains("Press 'r' to reload. 'q' to quit."));

    assert!(dir.path().join("report__preview.docx").is_file());
    let mirror = dir.path().join("report.docx__extracted");
    let document = std::fs::read_to_string(mirror.join("word/document.xml")).unwrap();
    assert!(
        document.contains("\n  <w:body>"),
        "watched part is pretty-printed\n{document}"
    );
    assert!(mirror.join("[Content_Types].xml").is_file());
}
