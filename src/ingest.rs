//! End-to-end answer ingest: question in, patched body part and quiet repack out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::command::Command;
use crate::context::SyncContext;
use crate::error::IngestError;
use crate::generate::{GenerationRequest, Generator};
use crate::patch::{self, PatchOutcome};

/// Result of an applied ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    /// Text written into the answer slot (before escaping).
    pub answer: String,
    pub patch: PatchOutcome,
    /// Whether the text is a generation failure description rather than an answer.
    pub from_failure: bool,
}

/// Clears the busy flag when dropped, on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AnswerIngestService {
    context: Arc<SyncContext>,
    generator: Arc<dyn Generator>,
    busy: AtomicBool,
    write_failure_text: bool,
}

impl AnswerIngestService {
    /// With `write_failure_text`, a generation failure is written into the
    /// document in place of the answer instead of failing the ingest.
    pub fn new(
        context: Arc<SyncContext>,
        generator: Arc<dyn Generator>,
        write_failure_text: bool,
    ) -> Self {
        Self {
            context,
            generator,
            busy: AtomicBool::new(false),
            write_failure_text,
        }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    /// Generate an answer for `request`, patch it into the body part and queue
    /// a quiet repack.
    ///
    /// Rejected with [`IngestError::AlreadyBusy`] (without calling the
    /// generator) while another ingest is in flight.
    pub fn ingest(&self, request: &GenerationRequest) -> Result<IngestReceipt, IngestError> {
        let Some(_guard) = self.try_acquire() else {
            tracing::info!("already processing an answer; dropping this one");
            return Err(IngestError::AlreadyBusy);
        };

        tracing::info!(kind = %request.kind, "question: {}", request.question);
        tracing::info!("answer: {}", request.answer);

        let (answer, from_failure) = match self.generator.generate(request) {
            Ok(text) => (text, false),
            Err(err) if self.write_failure_text => {
                tracing::warn!("generation failed, writing the failure into the document: {err}");
                (err.to_string(), true)
            }
            Err(err) => return Err(err.into()),
        };
        tracing::info!("response: {answer}");

        let escaped = quick_xml::escape::escape(answer.as_str());

        let parts = self.context.parts_watcher();
        parts.suppress_next();
        self.context.document_watcher().suppress_next();
        let outcome = {
            let _paused = parts.pause();
            patch::patch(self.context.paths().body_part(), &escaped)?
        };

        self.context
            .enqueue(Command::UpdateQuiet)
            .map_err(|_| IngestError::QueueClosed)?;

        Ok(IngestReceipt {
            answer,
            patch: outcome,
            from_failure,
        })
    }
}
