//! The consumer loop: the only code that mutates the packed file, the mirror
//! directory and the preview session.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use crate::archive::ArchiveSync;
use crate::clock::{Clock, Debounce};
use crate::command::{Command, CommandReceiver, Next};
use crate::context::SyncContext;
use crate::editor::Editor;
use crate::error::{Result, SyncError};

/// Timing knobs for the consumer loop.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Longest blocking wait for a command before probing the preview.
    pub liveness_tick: Duration,
    /// Reloads closer together than this are dropped.
    pub reload_debounce: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            liveness_tick: Duration::from_secs(1),
            reload_debounce: Duration::from_secs(1),
        }
    }
}

/// Why the consumer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineExit {
    /// A `quit` command was executed.
    Quit,
    /// The preview application went away; the process should exit.
    EditorClosed,
    /// Every producer is gone.
    QueueClosed,
}

/// Counters of executed (not merely received) commands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub reloads: usize,
    pub skipped_reloads: usize,
    pub updates: usize,
}

pub struct SyncEngine<E: Editor> {
    context: Arc<SyncContext>,
    archive: ArchiveSync,
    editor: E,
    session: Option<E::Session>,
    commands: CommandReceiver,
    clock: Arc<dyn Clock>,
    reload_debounce: Debounce,
    liveness_tick: Duration,
    stats: EngineStats,
}

impl<E: Editor> SyncEngine<E> {
    pub fn new(
        context: Arc<SyncContext>,
        commands: CommandReceiver,
        editor: E,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let archive = ArchiveSync::new(context.paths().clone());
        Self {
            context,
            archive,
            editor,
            session: None,
            commands,
            clock,
            reload_debounce: Debounce::new(settings.reload_debounce),
            liveness_tick: settings.liveness_tick,
            stats: EngineStats::default(),
        }
    }

    #[cfg(test)]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[cfg(test)]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Open the first preview, unpack, and start both watchers.
    pub fn start(&mut self) -> Result<()> {
        self.reload_debounce.ready(self.clock.now());
        self.open_preview()
    }

    /// Drain the queue until `quit`, editor loss, or queue closure.
    pub fn run(mut self) -> Result<EngineExit> {
        self.start()?;
        tracing::info!(
            "watching {} (mirror: {})",
            self.context.paths().canonical().display(),
            self.context.paths().mirror_dir().display()
        );

        loop {
            match self.commands.next(self.liveness_tick) {
                Next::Command(command) => {
                    if let ControlFlow::Break(exit) = self.execute(command) {
                        return Ok(exit);
                    }
                }
                Next::Idle => {
                    if !self.preview_alive() {
                        tracing::info!("preview was closed. exiting..");
                        self.context.document_watcher().stop();
                        self.context.parts_watcher().stop();
                        return Ok(EngineExit::EditorClosed);
                    }
                }
                Next::Closed => {
                    self.shutdown();
                    return Ok(EngineExit::QueueClosed);
                }
            }
        }
    }

    /// Execute one command. Failures are logged; only terminal conditions break.
    pub fn execute(&mut self, command: Command) -> ControlFlow<EngineExit> {
        let result = match command {
            Command::Reload => self.reload(),
            Command::Update => self.update(false),
            Command::UpdateQuiet => self.update(true),
            Command::Quit => {
                self.shutdown();
                return ControlFlow::Break(EngineExit::Quit);
            }
        };

        match result {
            Ok(()) => ControlFlow::Continue(()),
            Err(SyncError::EditorUnavailable(reason)) => {
                tracing::error!("editor unavailable: {reason}. exiting..");
                self.context.document_watcher().stop();
                self.context.parts_watcher().stop();
                ControlFlow::Break(EngineExit::EditorClosed)
            }
            Err(err) => {
                tracing::warn!(%command, "command failed: {err}");
                ControlFlow::Continue(())
            }
        }
    }

    fn reload(&mut self) -> Result<()> {
        if !self.reload_debounce.ready(self.clock.now()) {
            tracing::debug!("reload skipped (debounce)");
            self.stats.skipped_reloads += 1;
            return Ok(());
        }
        tracing::info!("reloading..");
        self.open_preview()
    }

    fn open_preview(&mut self) -> Result<()> {
        if let Some(session) = self.session.take()
            && let Err(err) = self.editor.close(session)
        {
            tracing::warn!("failed to close previous preview: {err}");
        }

        let paths = self.context.paths();
        std::fs::copy(paths.canonical(), paths.preview_copy())?;
        self.session = Some(self.editor.open(paths.preview_copy())?);

        let report = self.archive.unpack(self.context.parts_watcher())?;
        tracing::debug!(
            entries = report.entries,
            normalized = report.normalized.len(),
            malformed = report.malformed.len(),
            "unpacked"
        );

        self.context.document_watcher().start();
        self.context.parts_watcher().start();
        self.stats.reloads += 1;
        Ok(())
    }

    fn update(&mut self, quiet: bool) -> Result<()> {
        // A concurrent editor save may be mid-write; pack what is there anyway.
        for err in self.archive.validate_parts() {
            tracing::warn!("{err}");
        }
        tracing::info!("updating..");
        let report = self.archive.pack(self.context.document_watcher(), quiet)?;
        tracing::debug!(entries = report.entries, quiet, "packed");
        self.stats.updates += 1;
        Ok(())
    }

    fn preview_alive(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => self.editor.is_alive(session),
            None => true,
        }
    }

    fn shutdown(&mut self) {
        tracing::info!(
            reloads = self.stats.reloads,
            skipped_reloads = self.stats.skipped_reloads,
            updates = self.stats.updates,
            "exiting.."
        );
        self.context.document_watcher().stop();
        self.context.parts_watcher().stop();
        if let Some(session) = self.session.take()
            && let Err(err) = self.editor.close(session)
        {
            tracing::debug!("preview already gone: {err}");
        }
        if let Err(err) = self.editor.quit() {
            tracing::debug!("editor already gone: {err}");
        }
    }
}
