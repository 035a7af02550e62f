//! Helper command execution with a deadline.
//!
//! External tools (`shutdown`, `systemctl`, the overlay CLI) are treated as
//! fallible collaborators. Two modes exist:
//! - [`CommandRunner::output`] runs a query to completion. A non-zero exit is
//!   an error, and so is a command, or a descendant holding its pipes, that
//!   outlives the deadline.
//! - [`CommandRunner::launch`] starts an action such as a scheduled power-off.
//!   An early non-zero exit is an error; a command still running at the
//!   deadline is left alone and counts as started.

use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::PlatformError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs helper commands with a fixed timeout.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    search_path: Option<OsString>,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            search_path: None,
        }
    }

    /// Resolves programs through `path` instead of the inherited `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Runs the command to completion and returns its stdout.
    pub fn output(&self, program: &str, args: &[&str]) -> Result<String, PlatformError> {
        let deadline = Instant::now() + self.timeout;
        let mut running = self.start(program, args, Stdio::piped())?;

        let status = match running.wait_until(deadline)? {
            Some(status) => status,
            None => {
                running.kill();
                return Err(self.timed_out(&running.line));
            }
        };

        // A background descendant may keep the pipes open after the direct
        // child exited; the deadline covers reading them too.
        let stdout = read_pipe(running.stdout.take(), deadline);
        let stderr = read_pipe(running.stderr.take(), deadline);
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            debug!(command = %running.line, "Command exited but its output stayed open");
            return Err(self.timed_out(&running.line));
        };

        if !status.success() {
            return Err(failed(&running.line, status, &stderr));
        }
        Ok(stdout)
    }

    /// Starts a command that may legitimately keep running, such as
    /// `shutdown -h +1` waiting out its grace window in the foreground.
    ///
    /// Only an exit within the deadline is judged: success is success, a
    /// non-zero status is an error. A command still running at the deadline
    /// is left running and reported as started.
    pub fn launch(&self, program: &str, args: &[&str]) -> Result<(), PlatformError> {
        let deadline = Instant::now() + self.timeout;
        let mut running = self.start(program, args, Stdio::null())?;

        match running.wait_until(deadline)? {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                let stderr = read_pipe(running.stderr.take(), deadline).unwrap_or_default();
                Err(failed(&running.line, status, &stderr))
            }
            None => {
                debug!(command = %running.line, "Command still running at deadline, leaving it running");
                running.detach();
                Ok(())
            }
        }
    }

    fn start(&self, program: &str, args: &[&str], stdout: Stdio) -> Result<Running, PlatformError> {
        let line = command_line(program, args);
        debug!(command = %line, "Running helper command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped());
        if let Some(path) = &self.search_path {
            command.env("PATH", path);
        }

        let mut child = command.spawn().map_err(|source| PlatformError::Spawn {
            program: line.clone(),
            source,
        })?;

        // Pipes are drained on their own threads so a chatty command cannot
        // block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        Ok(Running {
            child,
            line,
            stdout,
            stderr,
        })
    }

    fn timed_out(&self, line: &str) -> PlatformError {
        PlatformError::Timeout {
            program: line.to_string(),
            timeout: self.timeout,
        }
    }
}

/// A spawned command and the receiving ends of its pipe readers.
struct Running {
    child: Child,
    line: String,
    stdout: Option<Receiver<String>>,
    stderr: Option<Receiver<String>>,
}

impl Running {
    /// Exit status, or `None` if the command is still running at `deadline`.
    fn wait_until(&mut self, deadline: Instant) -> Result<Option<ExitStatus>, PlatformError> {
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if Instant::now() >= deadline => return Ok(None),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    self.kill();
                    return Err(PlatformError::Spawn {
                        program: self.line.clone(),
                        source,
                    });
                }
            }
        }
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    /// Reaps the child in the background once it exits.
    fn detach(self) {
        let mut child = self.child;
        thread::spawn(move || {
            let _ = child.wait();
        });
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Pipe contents, or `None` when the pipe is still open at `deadline`.
fn read_pipe(pipe: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = pipe else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn failed(line: &str, status: ExitStatus, stderr: &str) -> PlatformError {
    PlatformError::CommandFailed {
        program: line.to_string(),
        status: status.to_string(),
        stderr: stderr.trim().to_string(),
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
