pub mod event;
pub mod poll;

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;

use event::QuestionEvent;
pub use poll::ChangeWatcher;

/// Handle to a running question-file watcher. Keeps the debouncer alive (dropping stops watching).
pub struct QuestionWatcherHandle {
    /// Keep alive: dropping the debouncer stops the OS watcher.
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// The bridge task forwarding events from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Start a debounced watcher on the question file.
///
/// The file's parent directory is watched (non-recursively) so the file may
/// be created after startup. Returns a `QuestionWatcherHandle` (must be kept
/// alive) and a tokio receiver yielding classified `QuestionEvent`s.
pub fn start_question_watcher(
    question_file: &Path,
    debounce: Duration,
) -> anyhow::Result<(QuestionWatcherHandle, tokio_mpsc::Receiver<QuestionEvent>)> {
    let watch_dir = question_file
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", question_file.display()))?
        .to_path_buf();

    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(debounce, move |res| {
        let _ = std_tx.send(res);
    })?;
    debouncer
        .watcher()
        .watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<QuestionEvent>(16);

    // Bridge: spawn_blocking to receive from std channel, classify, forward to tokio
    let target = question_file.to_path_buf();
    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            match result {
                Ok(events) => {
                    for debounced_event in events {
                        if let Some(event) = classify_event(&debounced_event.path, &target)
                            && tokio_tx.blocking_send(event).is_err()
                        {
                            return; // receiver dropped, shutdown
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("question watcher error: {err:?}");
                }
            }
        }
    });

    Ok((
        QuestionWatcherHandle {
            _debouncer: debouncer,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// Classify a filesystem event path, or `None` if it is not the question file.
fn classify_event(path: &Path, target: &Path) -> Option<QuestionEvent> {
    if !same_file_path(path, target) {
        return None;
    }
    if path.exists() {
        Some(QuestionEvent::Saved(target.to_path_buf()))
    } else {
        Some(QuestionEvent::Removed(target.to_path_buf()))
    }
}

/// Path equality tolerant of platform canonicalization (e.g. `/private/var` on macOS).
fn same_file_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let canon = |p: &Path| -> Option<PathBuf> {
        let parent = p.parent()?.canonicalize().ok()?;
        Some(parent.join(p.file_name()?))
    };
    matches!((canon(a), canon(b)), (Some(x), Some(y)) if x == y)
}
