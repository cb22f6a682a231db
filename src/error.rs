use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the synchronization core (archive, parts, preview).
#[derive(Debug, Error)]
pub enum SyncError {
    /// A watched XML part is not well-formed markup.
    #[error("malformed part {path}: {reason}")]
    MalformedPart { path: PathBuf, reason: String },

    /// The external editor (or its open document) is gone.
    #[error("editor unavailable: {0}")]
    EditorUnavailable(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of a single patch attempt on a part.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("section-properties anchor <w:sectPr> not found in {0}")]
    AnchorNotFound(PathBuf),

    #[error("tagged text node in {0} has no closing </w:t>")]
    UnterminatedNode(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the text-generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured (set ANTHROPIC_API_KEY)")]
    MissingApiKey,

    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service returned no text")]
    EmptyResponse,

    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

/// Failures of one end-to-end ingest, kept distinct per stage.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Another ingest is still in flight; this one was dropped.
    #[error("an answer is already being processed")]
    AlreadyBusy,

    /// The text-generation collaborator failed.
    #[error("generation failed: {0}")]
    GenerationFailure(#[from] GenerationError),

    /// The body part has no answer slot and no section-properties anchor.
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),

    #[error("command queue is closed")]
    QueueClosed,
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
