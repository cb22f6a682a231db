use std::path::PathBuf;

/// Classified save events on the question file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionEvent {
    /// The question file was written (created or modified).
    Saved(PathBuf),
    /// The question file was deleted.
    Removed(PathBuf),
}
