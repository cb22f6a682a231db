//! Automation seam for the external word-processing application.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{Result, SyncError};

/// Controls the application that shows the live preview.
///
/// The engine holds at most one session at a time and is the only caller.
pub trait Editor: Send {
    type Session: Send;

    /// Open `path` and return a handle to the shown document.
    fn open(&mut self, path: &Path) -> Result<Self::Session>;

    /// Close a previously opened document.
    fn close(&mut self, session: Self::Session) -> Result<()>;

    /// Whether the document (and the application showing it) is still there.
    fn is_alive(&mut self, session: &mut Self::Session) -> bool;

    /// Shut the application down.
    fn quit(&mut self) -> Result<()>;
}

/// Stands for a private, per-run profile directory in the editor command,
/// written as a `file://` URL (e.g. `-env:UserInstallation={profile}`).
pub const PROFILE_PLACEHOLDER: &str = "{profile}";

/// How long a closed viewer gets to exit before it is killed.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Runs a viewer command per preview, e.g. `libreoffice --writer <file>`.
///
/// The command must stay in the foreground while the document is open: when
/// the child exits the engine treats the preview as closed by the user.
/// Single-instance launchers hand the file to a running instance and exit at
/// once, so the default command points the office suite at its own profile
/// through [`PROFILE_PLACEHOLDER`], which makes the child own its window.
#[derive(Debug)]
pub struct ProcessEditor {
    program: String,
    args: Vec<String>,
    /// Removed when the editor is dropped.
    profile: Option<tempfile::TempDir>,
}

/// A running viewer process, leader of its own process group on unix.
#[derive(Debug)]
pub struct ProcessSession {
    child: Child,
}

impl ProcessEditor {
    /// Build from a command line; the first element is the program.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SyncError::EditorUnavailable("empty editor command".to_string()))?;

        let profile = if command.iter().any(|arg| arg.contains(PROFILE_PLACEHOLDER)) {
            Some(
                tempfile::Builder::new()
                    .prefix("docx-live-reload-profile-")
                    .tempdir()?,
            )
        } else {
            None
        };

        let expand = |arg: &String| match &profile {
            Some(dir) => arg.replace(PROFILE_PLACEHOLDER, &file_url(dir.path())),
            None => arg.clone(),
        };
        Ok(Self {
            program: expand(program),
            args: args.iter().map(expand).collect(),
            profile,
        })
    }

    /// The private profile directory, if the command asked for one.
    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile.as_ref().map(|dir| dir.path())
    }
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// Ask the viewer and everything it spawned to exit.
#[cfg(unix)]
fn terminate(child: &Child) {
    // The child leads its own group, so this also reaches helper processes.
    unsafe {
        let _ = libc::kill(-(child.id() as libc::pid_t), libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {}

#[cfg(unix)]
fn kill_group(child: &Child) {
    unsafe {
        let _ = libc::kill(-(child.id() as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

impl Editor for ProcessEditor {
    type Session = ProcessSession;

    fn open(&mut self, path: &Path) -> Result<ProcessSession> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command
            .spawn()
            .map_err(|e| SyncError::EditorUnavailable(format!("failed to start {}: {e}", self.program)))?;
        tracing::debug!(pid = child.id(), "preview opened");
        Ok(ProcessSession { child })
    }

    fn close(&mut self, mut session: ProcessSession) -> Result<()> {
        let child = &mut session.child;
        // Already exited is fine; the preview is gone either way.
        if matches!(child.try_wait(), Ok(Some(_))) {
            return Ok(());
        }

        terminate(child);
        let deadline = Instant::now() + CLOSE_GRACE;
        while Instant::now() < deadline {
            if matches!(child.try_wait(), Ok(Some(_))) {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        kill_group(child);
        child
            .kill()
            .map_err(|e| SyncError::EditorUnavailable(format!("failed to close preview: {e}")))?;
        let _ = child.wait();
        Ok(())
    }

    fn is_alive(&mut self, session: &mut ProcessSession) -> bool {
        matches!(session.child.try_wait(), Ok(None))
    }

    fn quit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            ProcessEditor::new(&[]),
            Err(SyncError::EditorUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let mut editor =
            ProcessEditor::new(&["docx-live-reload-no-such-viewer".to_string()]).unwrap();
        let err = editor.open(Path::new("quiz.docx")).unwrap_err();
        assert!(matches!(err, SyncError::EditorUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_lifecycle() {
        let mut editor = ProcessEditor::new(&["sleep".to_string()]).unwrap();
        // `sleep 30` stands in for a viewer holding the document open.
        let mut session = editor.open(Path::new("30")).unwrap();
        assert!(editor.is_alive(&mut session));
        editor.close(session).unwrap();
        editor.quit().unwrap();
    }

    #[test]
    fn test_profile_placeholder_expands_to_private_dir_url() {
        let command = vec![
            "libreoffice".to_string(),
            format!("-env:UserInstallation={PROFILE_PLACEHOLDER}"),
            "--writer".to_string(),
        ];
        let editor = ProcessEditor::new(&command).unwrap();

        let profile = editor.profile_dir().unwrap().to_path_buf();
        assert!(profile.is_dir());
        assert!(editor.args[0].starts_with("-env:UserInstallation=file:///"));
        assert!(!editor.args[0].contains(PROFILE_PLACEHOLDER));
        assert_eq!(editor.args[1], "--writer");

        drop(editor);
        assert!(!profile.exists(), "profile removed with the editor");
    }

    #[test]
    fn test_no_placeholder_no_profile() {
        let editor = ProcessEditor::new(&["evince".to_string()]).unwrap();
        assert!(editor.profile_dir().is_none());
    }

    /// Whether `pid` exists and is not a zombie waiting to be reaped.
    #[cfg(unix)]
    fn running(pid: libc::pid_t) -> bool {
        if unsafe { libc::kill(pid, 0) } != 0 {
            return false;
        }
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => true,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_close_stops_processes_the_viewer_spawned() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper.pid");
        // The shell backgrounds a helper and records its pid in `$0`, the
        // path argument the editor appends.
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "sleep 30 & echo $! > \"$0\"; wait".to_string(),
        ];
        let mut editor = ProcessEditor::new(&command).unwrap();
        let session = editor.open(&pid_file).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let helper: libc::pid_t = loop {
            if let Ok(text) = std::fs::read_to_string(&pid_file)
                && let Ok(pid) = text.trim().parse()
            {
                break pid;
            }
            assert!(Instant::now() < deadline, "helper never started");
            std::thread::sleep(Duration::from_millis(10));
        };

        editor.close(session).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while running(helper) {
            assert!(Instant::now() < deadline, "helper {helper} outlived the preview");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_viewer_is_not_alive() {
        let mut editor = ProcessEditor::new(&["true".to_string()]).unwrap();
        let mut session = editor.open(Path::new("quiz.docx")).unwrap();
        let _ = session.child.wait();
        assert!(!editor.is_alive(&mut session));
        editor.close(session).unwrap();
    }
}
