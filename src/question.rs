//! Local trigger: saving `<stem>__question.txt` next to the document asks
//! for an answer the same way `POST /log` does.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::IngestError;
use crate::generate::{GenerationRequest, QuestionKind};
use crate::ingest::AnswerIngestService;
use crate::watcher::event::QuestionEvent;

/// Read the question file into a free-form request. Blank files yield `None`.
pub fn read_question(path: &Path) -> std::io::Result<Option<GenerationRequest>> {
    let text = std::fs::read_to_string(path)?;
    let question = text.trim();
    if question.is_empty() {
        return Ok(None);
    }
    Ok(Some(GenerationRequest {
        question: question.to_string(),
        answer: String::new(),
        kind: QuestionKind::FreeForm,
    }))
}

/// Consume question-file events until the watcher's channel closes.
pub async fn run(ingest: Arc<AnswerIngestService>, mut events: mpsc::Receiver<QuestionEvent>) {
    while let Some(event) = events.recv().await {
        let path = match event {
            QuestionEvent::Saved(path) => path,
            QuestionEvent::Removed(path) => {
                tracing::debug!("question file removed: {}", path.display());
                continue;
            }
        };

        let request = match read_question(&path) {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!("question file is empty; ignoring");
                continue;
            }
            Err(err) => {
                tracing::warn!("failed to read {}: {err}", path.display());
                continue;
            }
        };

        let service = Arc::clone(&ingest);
        match tokio::task::spawn_blocking(move || service.ingest(&request)).await {
            Ok(Ok(receipt)) => tracing::info!(
                patch = ?receipt.patch,
                from_failure = receipt.from_failure,
                "question file answered"
            ),
            Ok(Err(IngestError::AlreadyBusy)) => {}
            Ok(Err(err)) => tracing::warn!("question file ingest failed: {err}"),
            Err(err) => tracing::error!("question file task failed: {err}"),
        }
    }
}
