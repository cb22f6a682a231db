//! The producer loop: turns watcher observations into queued commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::clock::{Clock, Debounce};
use crate::command::{Command, QueueClosed};
use crate::context::SyncContext;

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            debounce: Duration::from_secs(1),
        }
    }
}

/// Polls both watchers and enqueues `reload` / `update` with per-command debounce.
pub struct ChangeMonitor {
    context: Arc<SyncContext>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    reload_debounce: Debounce,
    update_debounce: Debounce,
}

impl ChangeMonitor {
    pub fn new(context: Arc<SyncContext>, clock: Arc<dyn Clock>, settings: MonitorSettings) -> Self {
        Self {
            context,
            clock,
            poll_interval: settings.poll_interval,
            reload_debounce: Debounce::new(settings.debounce),
            update_debounce: Debounce::new(settings.debounce),
        }
    }

    /// One polling pass. Returns the commands enqueued.
    pub fn poll_once(&mut self) -> Result<Vec<Command>, QueueClosed> {
        let mut sent = Vec::new();

        if self.context.document_watcher().changed() {
            if self.reload_debounce.ready(self.clock.now()) {
                tracing::info!("change in docx file detected!");
                self.context.enqueue(Command::Reload)?;
                sent.push(Command::Reload);
            } else {
                tracing::debug!("docx change inside debounce window");
            }
        }

        if self.context.parts_watcher().changed() {
            if self.update_debounce.ready(self.clock.now()) {
                tracing::info!("change in extracted xmls detected!");
                self.context.enqueue(Command::Update)?;
                sent.push(Command::Update);
            } else {
                tracing::debug!("xml change inside debounce window");
            }
        }

        Ok(sent)
    }

    /// Poll until `stop` is set or the queue closes.
    pub fn run(mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if self.poll_once().is_err() {
                tracing::debug!("command queue closed; monitor stopping");
                return;
            }
            self.clock.sleep(self.poll_interval);
        }
    }
}
