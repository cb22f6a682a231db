use std::path::PathBuf;

use clap::Parser;

/// Live-reload bridge between a .docx file and its extracted XML parts.
///
/// Opens a preview of the document, unpacks it next to the original, and keeps
/// both sides in sync: edits to the extracted XML are repacked into the .docx,
/// and saves of the .docx refresh the preview and the extracted parts.
#[derive(Parser, Debug)]
#[command(name = "docx-live-reload", version, about, long_about = None)]
pub struct Cli {
    /// Path to the .docx document to watch.
    #[arg(value_parser = parse_docx_path)]
    pub docx_path: PathBuf,

    /// Port for the answer ingress (overrides the config file).
    #[arg(long)]
    pub port: Option<u16>,

    /// Do not start the HTTP answer ingress.
    #[arg(long)]
    pub no_server: bool,

    /// Preview application command; the preview copy path is appended
    /// (e.g. --editor "libreoffice --writer").
    #[arg(long)]
    pub editor: Option<String>,
}

impl Cli {
    /// `--editor` split on whitespace, if given.
    pub fn editor_command(&self) -> Option<Vec<String>> {
        self.editor
            .as_deref()
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
            .filter(|parts: &Vec<String>| !parts.is_empty())
    }
}

fn parse_docx_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    let is_docx = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    if !is_docx {
        return Err("File must be of the Docx format".to_string());
    }
    if !path.is_file() {
        return Err("File does not exist".to_string());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_extension() {
        let err = Cli::try_parse_from(["docx-live-reload", "notes.txt"]).unwrap_err();
        assert!(err.to_string().contains("File must be of the Docx format"));
    }

    #[test]
    fn test_rejects_missing_file() {
        let err = Cli::try_parse_from(["docx-live-reload", "/nonexistent/report.docx"]).unwrap_err();
        assert!(err.to_string().contains("File does not exist"));
    }

    #[test]
    fn test_parses_flags() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("Report.DOCX");
        std::fs::write(&docx, b"PK").unwrap();

        let cli = Cli::try_parse_from([
            "docx-live-reload",
            docx.to_str().unwrap(),
            "--port",
            "6001",
            "--no-server",
            "--editor",
            "evince --fullscreen",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(6001));
        assert!(cli.no_server);
        assert_eq!(
            cli.editor_command(),
            Some(vec!["evince".to_string(), "--fullscreen".to_string()])
        );
    }
}
