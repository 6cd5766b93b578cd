//! Builder and runner for external tool invocations with timeout support.
//!
//! A [`ToolCommand`] describes one invocation (program, arguments, timeout).
//! A [`ProcessRunner`] executes it. [`SystemRunner`] is the only
//! implementation that touches the operating system's process facilities;
//! tests substitute their own runner.

use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How often to check whether the child has exited.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How many leading tokens of a command line to keep in diagnostics.
const DESCRIBE_TOKENS: usize = 3;

/// Output captured from a tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exit code (`-1` if the process was terminated by a signal).
    pub exit_code: i32,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A builder for constructing external tool invocations.
///
/// No shell is involved: arguments are passed to the program verbatim,
/// including paths that are not valid UTF-8.
///
/// # Example
///
/// ```no_run
/// use reelforge_av::{ProcessRunner, SystemRunner, ToolCommand};
///
/// let mut cmd = ToolCommand::new("ffprobe");
/// cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"])
///     .arg("/path/to/video.mp4");
/// let output = SystemRunner::new().run(&cmd)?;
/// println!("{}", output.stdout);
/// # Ok::<(), reelforge_av::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_owned());
        self
    }

    /// Append a path argument.
    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        self.args.push(path.as_os_str().to_owned());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Short name of the program, used in error messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Whether `value` appears anywhere in the arguments.
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }

    /// Whether `flag` is immediately followed by `value` in the arguments.
    pub fn has_option(&self, flag: &str, value: &str) -> bool {
        self.args
            .windows(2)
            .any(|w| w[0] == flag && w[1] == value)
    }

    /// Truncated command line for diagnostics: the program and its first
    /// couple of arguments, followed by `...` when anything was cut.
    pub fn describe(&self) -> String {
        let mut parts = Vec::with_capacity(DESCRIBE_TOKENS);
        parts.push(self.program.to_string_lossy().into_owned());
        parts.extend(
            self.args
                .iter()
                .take(DESCRIBE_TOKENS - 1)
                .map(|a| a.to_string_lossy().into_owned()),
        );
        let mut line = parts.join(" ");
        if self.args.len() > DESCRIBE_TOKENS - 1 {
            line.push_str(" ...");
        }
        line
    }

    /// The full command line, for debug logging.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Something that can execute a [`ToolCommand`].
///
/// Implementations must report a non-zero exit as `Ok` with the exit code
/// set; only failures to run the process at all are errors.
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion (or until its timeout expires).
    ///
    /// # Errors
    ///
    /// - [`Error::ExecutableNotFound`] if the program cannot be launched.
    /// - [`Error::Timeout`] if it outlives its timeout; the process is killed.
    /// - [`Error::ExecutionFailed`] for any other spawn or I/O failure.
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput>;
}

/// Runs commands as child processes of the current process.
///
/// On unix each child leads its own process group. When the timeout
/// expires the whole group is killed, so helpers the tool forked do not
/// outlive it. The timeout also bounds collecting the output: a descendant
/// that keeps stdout or stderr open after the child exits counts as a
/// timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

impl ProcessRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        tracing::debug!(command = %cmd.command_line(), "executing external tool");

        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ExecutableNotFound {
                    path: cmd.program().to_path_buf(),
                }
            } else {
                Error::ExecutionFailed {
                    command: cmd.describe(),
                    source: e,
                }
            }
        })?;

        let deadline = Instant::now() + cmd.get_timeout();

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe buffer while we wait for it.
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(out) = child.stdout.take() {
            pending += 1;
            let tx = tx.clone();
            thread::spawn(move || {
                let _ = tx.send((Pipe::Stdout, drain(out)));
            });
        }
        if let Some(err) = child.stderr.take() {
            pending += 1;
            thread::spawn(move || {
                let _ = tx.send((Pipe::Stderr, drain(err)));
            });
        }

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(timed_out(&mut child, cmd));
                    }
                    thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(e) => {
                    kill_tree(&mut child);
                    return Err(Error::ExecutionFailed {
                        command: cmd.describe(),
                        source: e,
                    });
                }
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((Pipe::Stdout, text)) => stdout = text,
                Ok((Pipe::Stderr, text)) => stderr = text,
                Err(RecvTimeoutError::Timeout) => return Err(timed_out(&mut child, cmd)),
                Err(RecvTimeoutError::Disconnected) => break,
            }
            pending -= 1;
        }

        let output = ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        };

        tracing::debug!(
            tool = %cmd.program_name(),
            exit_code = output.exit_code,
            "external tool finished"
        );

        Ok(output)
    }
}

/// Kill the child's process tree and build the timeout error.
fn timed_out(child: &mut Child, cmd: &ToolCommand) -> Error {
    kill_tree(child);
    tracing::warn!(
        command = %cmd.describe(),
        timeout_secs = cmd.get_timeout().as_secs_f64(),
        "external tool timed out and was killed"
    );
    Error::Timeout {
        command: cmd.describe(),
        timeout: cmd.get_timeout(),
    }
}

/// Kill the child and, on unix, every process in its group, then reap it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // The child leads its group, so its pid is the group id.
        if let Ok(pgid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn drain(mut reader: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
