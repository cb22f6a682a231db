use std::path::{Path, PathBuf};

/// Suffix appended to the file stem of the preview copy.
const PREVIEW_SUFFIX: &str = "__preview";
/// Suffix appended to the file name of the mirror directory.
const MIRROR_SUFFIX: &str = "__extracted";
/// Suffix appended to the file stem of the question text file.
const QUESTION_SUFFIX: &str = "__question";

/// Watched parts, relative to the mirror directory. The body part comes first
/// because it is the default patch target.
pub const WATCHED_PARTS: &[&str] = &["word/document.xml", "word/styles.xml"];

/// Every location derived from the canonical document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSet {
    canonical: PathBuf,
    preview_copy: PathBuf,
    mirror_dir: PathBuf,
    watched_parts: Vec<PathBuf>,
    question_file: PathBuf,
}

impl PathSet {
    /// Derive the path set from the canonical document path.
    ///
    /// Relative paths are made absolute against the current directory so the
    /// derived siblings stay valid if the working directory changes later.
    pub fn new(path: &Path) -> Self {
        let canonical = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        let stem = canonical
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = canonical
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = canonical
            .extension()
            .map(|s| format!(".{}", s.to_string_lossy()))
            .unwrap_or_default();

        let preview_copy = canonical.with_file_name(format!("{stem}{PREVIEW_SUFFIX}{ext}"));
        let mirror_dir = canonical.with_file_name(format!("{name}{MIRROR_SUFFIX}"));
        let question_file = canonical.with_file_name(format!("{stem}{QUESTION_SUFFIX}.txt"));
        let watched_parts = WATCHED_PARTS
            .iter()
            .map(|rel| mirror_dir.join(rel))
            .collect();

        Self {
            canonical,
            preview_copy,
            mirror_dir,
            watched_parts,
            question_file,
        }
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    pub fn preview_copy(&self) -> &Path {
        &self.preview_copy
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    pub fn watched_parts(&self) -> &[PathBuf] {
        &self.watched_parts
    }

    /// The document body part, target of answer patches.
    pub fn body_part(&self) -> &Path {
        &self.watched_parts[0]
    }

    pub fn question_file(&self) -> &Path {
        &self.question_file
    }

    /// Directory holding the canonical document (and its config file).
    pub fn document_dir(&self) -> &Path {
        self.canonical.parent().unwrap_or_else(|| Path::new("."))
    }
}
