use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Mutating operations, executed one at a time by the sync engine.
///
/// Commands carry no payload: everything they need is read from the engine
/// context when they reach the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Reopen the preview from a fresh copy and re-unpack the archive.
    Reload,
    /// Repack the archive from the mirror directory.
    Update,
    /// Repack without letting the archive's own timestamp change trigger a reload.
    UpdateQuiet,
    /// Shut the engine down.
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Reload => "reload",
            Command::Update => "update",
            Command::UpdateQuiet => "update-quiet",
            Command::Quit => "quit",
        };
        f.write_str(name)
    }
}

/// The queue's consumer side was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

/// Producer handle; cheap to clone, one per producer.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), QueueClosed> {
        tracing::debug!(%command, "enqueue");
        self.tx.send(command).map_err(|_| QueueClosed)
    }
}

/// Outcome of waiting on the queue for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Command(Command),
    /// The tick elapsed with nothing queued.
    Idle,
    /// Every sender is gone.
    Closed,
}

/// Single consumer side. Commands are delivered in enqueue order.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: Receiver<Command>,
}

impl CommandReceiver {
    /// Block for the next command, at most `tick`.
    pub fn next(&self, tick: Duration) -> Next {
        match self.rx.recv_timeout(tick) {
            Ok(command) => Next::Command(command),
            Err(RecvTimeoutError::Timeout) => Next::Idle,
            Err(RecvTimeoutError::Disconnected) => Next::Closed,
        }
    }

    /// Take a command if one is already queued.
    #[cfg(test)]
    pub fn try_next(&self) -> Option<Command> {
        self.rx.try_recv().ok()
    }
}

pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_arrive_in_fifo_order_across_producers() {
        let (tx, rx) = command_queue();
        let monitor = tx.clone();
        let ingest = tx.clone();

        ingest.send(Command::UpdateQuiet).unwrap();
        monitor.send(Command::Reload).unwrap();
        tx.send(Command::Quit).unwrap();

        let tick = Duration::from_millis(10);
        assert_eq!(rx.next(tick), Next::Command(Command::UpdateQuiet));
        assert_eq!(rx.next(tick), Next::Command(Command::Reload));
        assert_eq!(rx.next(tick), Next::Command(Command::Quit));
        assert_eq!(rx.next(tick), Next::Idle);
    }

    #[test]
    fn test_closed_queue() {
        let (tx, rx) = command_queue();
        drop(tx);
        assert_eq!(rx.next(Duration::from_millis(10)), Next::Closed);

        let (tx, rx) = command_queue();
        drop(rx);
        assert_eq!(tx.send(Command::Update), Err(QueueClosed));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Command::UpdateQuiet.to_string(), "update-quiet");
        assert_eq!(Command::Reload.to_string(), "reload");
    }
}
