use std::path::{Path, PathBuf};

/// Entry that archive readers expect to find first in an office package.
const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";

/// A file found in the mirror directory, paired with its archive entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFile {
    pub path: PathBuf,
    /// Path relative to the mirror root, `/`-separated.
    pub entry_name: String,
}

/// Walk the mirror directory and collect every regular file.
///
/// Unlike a source-tree walk, nothing is filtered: hidden files and files an
/// ignore rule would skip are still package parts. Results are ordered with
/// `[Content_Types].xml` first and the rest by entry name, so repeated packs
/// of the same tree produce the same entry order.
pub fn walk_mirror(root: &Path) -> Vec<MirrorFile> {
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("skipping unreadable mirror entry: {err}");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(entry_name) = entry_name(root, path) else {
            continue;
        };

        files.push(MirrorFile {
            path: path.to_path_buf(),
            entry_name,
        });
    }

    files.sort_by(|a, b| {
        let a_first = a.entry_name == CONTENT_TYPES_ENTRY;
        let b_first = b.entry_name == CONTENT_TYPES_ENTRY;
        b_first
            .cmp(&a_first)
            .then_with(|| a.entry_name.cmp(&b.entry_name))
    });

    files
}

/// Archive entry name of `path` relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
