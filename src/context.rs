use crate::command::{Command, CommandReceiver, CommandSender, QueueClosed, command_queue};
use crate::paths::PathSet;
use crate::watcher::ChangeWatcher;

/// State shared by the consumer loop, the monitor loop and the ingest service.
///
/// Constructed once at startup and handed out behind an `Arc`; the paths are
/// immutable and the watchers guard their own state.
#[derive(Debug)]
pub struct SyncContext {
    paths: PathSet,
    document_watcher: ChangeWatcher,
    parts_watcher: ChangeWatcher,
    commands: CommandSender,
}

impl SyncContext {
    /// Build the context and the queue's consumer end, which belongs to the engine.
    pub fn new(paths: PathSet) -> (Self, CommandReceiver) {
        let (commands, receiver) = command_queue();
        let document_watcher = ChangeWatcher::new("docx", vec![paths.canonical().to_path_buf()]);
        let parts_watcher = ChangeWatcher::new("xml", paths.watched_parts().to_vec());
        let context = Self {
            paths,
            document_watcher,
            parts_watcher,
            commands,
        };
        (context, receiver)
    }

    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    /// Watches the canonical packed file.
    pub fn document_watcher(&self) -> &ChangeWatcher {
        &self.document_watcher
    }

    /// Watches the watched XML parts inside the mirror directory.
    pub fn parts_watcher(&self) -> &ChangeWatcher {
        &self.parts_watcher
    }

    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    pub fn enqueue(&self, command: Command) -> Result<(), QueueClosed> {
        self.commands.send(command)
    }
}
