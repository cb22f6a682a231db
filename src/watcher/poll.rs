use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Mutable watcher state, guarded by the watcher's lock.
#[derive(Debug, Default)]
struct WatchState {
    /// Last observed modification time per path; `None` when the path was missing.
    last_seen: HashMap<PathBuf, Option<SystemTime>>,
    active: bool,
    /// Outstanding [`PauseGuard`]s; reporting is held off while non-zero.
    pauses: usize,
    suppress_next: bool,
}

/// Polling change detector over a fixed set of paths.
///
/// Two independent switches control what it reports:
/// - pause (`stop`/`start`, or a scoped [`pause`](Self::pause)): while stopped
///   or paused, [`changed`](Self::changed) is always false and an armed
///   suppression is left armed.
/// - one-shot suppression ([`suppress_next`](Self::suppress_next)): the next active
///   evaluation reports false and absorbs whatever changed, so the engine never
///   reacts to its own writes.
///
/// All methods take `&self`; the watcher is shared between the consumer loop,
/// the monitor loop and the ingest service.
#[derive(Debug)]
pub struct ChangeWatcher {
    name: &'static str,
    paths: Vec<PathBuf>,
    state: Mutex<WatchState>,
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ChangeWatcher {
    pub fn new(name: &'static str, paths: Vec<PathBuf>) -> Self {
        Self {
            name,
            paths,
            state: Mutex::new(WatchState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, state: &mut WatchState) -> bool {
        let mut changed = false;
        for path in &self.paths {
            let current = mtime(path);
            let previous = state.last_seen.insert(path.clone(), current);
            if previous != Some(current) {
                changed = true;
            }
        }
        changed
    }

    /// Re-snapshot every path and begin reporting changes.
    pub fn start(&self) {
        let mut state = self.lock();
        self.snapshot(&mut state);
        state.active = true;
        tracing::debug!(watcher = self.name, "watcher started");
    }

    /// Pause reporting. The snapshot is kept; `start` takes a fresh one.
    pub fn stop(&self) {
        self.lock().active = false;
        tracing::debug!(watcher = self.name, "watcher stopped");
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Hold off reporting until the returned guard drops, then re-snapshot.
    ///
    /// Wraps a write the engine makes itself: polls that land mid-write see
    /// nothing and do not consume an armed suppression. Guards nest, and the
    /// `start`/`stop` state is left as it was.
    pub fn pause(&self) -> PauseGuard<'_> {
        self.lock().pauses += 1;
        PauseGuard { watcher: self }
    }

    /// Arm the one-shot suppression.
    pub fn suppress_next(&self) {
        self.lock().suppress_next = true;
    }

    #[cfg(test)]
    pub fn is_suppressed(&self) -> bool {
        self.lock().suppress_next
    }

    /// Whether any watched path changed since the previous evaluation.
    ///
    /// Every evaluation while active refreshes all snapshots, so one change is
    /// reported once. A consumed suppression refreshes them too: the change it
    /// hid is never reported later.
    pub fn changed(&self) -> bool {
        let mut state = self.lock();
        if !state.active || state.pauses > 0 {
            return false;
        }

        let changed = self.snapshot(&mut state);
        if state.suppress_next {
            state.suppress_next = false;
            if changed {
                tracing::debug!(watcher = self.name, "suppressed self-triggered change");
            }
            return false;
        }
        changed
    }
}

/// Scoped pause returned by [`ChangeWatcher::pause`].
#[must_use = "the watcher resumes as soon as the guard is dropped"]
pub struct PauseGuard<'a> {
    watcher: &'a ChangeWatcher,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.watcher.lock();
        state.pauses = state.pauses.saturating_sub(1);
        if state.pauses == 0 {
            self.watcher.snapshot(&mut state);
        }
    }
}
