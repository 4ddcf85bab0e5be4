//! Subprocess execution utilities.
//!
//! Processes are spawned into their own process group (Unix) so that a
//! cancellation can take down everything they started. Output is read on two
//! background threads and handed to the caller one line at a time, in the
//! order lines arrive.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio_util::sync::CancellationToken;

const POLL: Duration = Duration::from_millis(50);

/// How long output may stay quiet after the process exited before it is
/// abandoned.
pub const DRAIN: Duration = Duration::from_millis(250);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

/// One line of subprocess output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// How a streamed subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(ExitStatus),
    Canceled,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(status) if status.success())
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ProcessOutcome::Exited(status) => status.code(),
            ProcessOutcome::Canceled => None,
        }
    }
}

/// Everything a subprocess printed, for callers that need the whole output.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub outcome: ProcessOutcome,
    pub stdout: String,
    pub stderr_lines: Vec<String>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory, if one was set.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;

            cmd.pre_exec(|| {
                // SAFETY: `setpgid` is async-signal-safe and runs in the child
                // between fork and exec.
                if libc::setpgid(0, 0) != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd
    }

    /// Start the process with piped output.
    ///
    /// An error here means the process never ran.
    pub fn spawn(&self) -> io::Result<RunningProcess> {
        let mut child = self.build_command().spawn()?;

        let Some(stdout) = child.stdout.take() else {
            return Err(io::Error::other("child stdout was not captured"));
        };
        let Some(stderr) = child.stderr.take() else {
            return Err(io::Error::other("child stderr was not captured"));
        };

        tracing::debug!("started pid {}: {}", child.id(), self.display_command());

        let (tx, rx) = crossbeam_channel::unbounded();
        spawn_reader(stdout, tx.clone(), OutputLine::Stdout);
        spawn_reader(stderr, tx, OutputLine::Stderr);

        Ok(RunningProcess { child, lines: rx })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|arg| {
            if arg.contains(' ') || arg.contains('\t') {
                format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
                arg.clone()
            }
        }));
        parts.join(" ")
    }
}

/// A spawned process whose output has not been consumed yet.
#[derive(Debug)]
pub struct RunningProcess {
    child: Child,
    lines: Receiver<OutputLine>,
}

impl RunningProcess {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Feed every output line to `on_line` as it arrives, until the process
    /// exits and its output is drained, or `cancel` fires.
    ///
    /// Completion follows the child, not its pipes: once the child has
    /// exited, lines keep being delivered until the streams close or stay
    /// quiet for [`DRAIN`], so a background process that inherited the
    /// pipes cannot hold the caller up.
    ///
    /// On cancellation the whole process group is killed and no further
    /// lines are delivered.
    pub fn stream(
        mut self,
        cancel: &CancellationToken,
        mut on_line: impl FnMut(OutputLine),
    ) -> io::Result<ProcessOutcome> {
        let mut exited: Option<ExitStatus> = None;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!("killing pid {}", self.child.id());
                kill_process_tree(&mut self.child)?;
                return Ok(ProcessOutcome::Canceled);
            }

            if exited.is_none() {
                exited = self.child.try_wait()?;
            }

            let timeout = if exited.is_some() { DRAIN } else { POLL };
            match self.lines.recv_timeout(timeout) {
                Ok(line) => on_line(line),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(status) = exited {
                        tracing::debug!(
                            "pid {} exited with {}, its output is still open",
                            self.child.id(),
                            status
                        );
                        return Ok(ProcessOutcome::Exited(status));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => match exited {
                    Some(status) => {
                        tracing::debug!("pid {} exited with {}", self.child.id(), status);
                        return Ok(ProcessOutcome::Exited(status));
                    }
                    None => thread::sleep(POLL),
                },
            }
        }
    }

    /// Run to completion, keeping stdout whole and stderr as lines.
    pub fn capture(self, cancel: &CancellationToken) -> io::Result<CapturedOutput> {
        let mut stdout = String::new();
        let mut stderr_lines = Vec::new();
        let outcome = self.stream(cancel, |line| match line {
            OutputLine::Stdout(line) => {
                stdout.push_str(&line);
                stdout.push('\n');
            }
            OutputLine::Stderr(line) => stderr_lines.push(line),
        })?;
        Ok(CapturedOutput {
            outcome,
            stdout,
            stderr_lines,
        })
    }
}

fn spawn_reader<R>(stream: R, tx: Sender<OutputLine>, wrap: fn(String) -> OutputLine)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(wrap(line)).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn kill_process_tree(child: &mut Child) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        // Negative pid addresses the process group set up in `pre_exec`.
        let pid = child.id() as i32;
        unsafe {
            let _ = libc::kill(-pid, libc::SIGKILL);
        }
        child.wait()
    }

    #[cfg(windows)]
    {
        let pid = child.id().to_string();
        let _ = Command::new("taskkill")
            .args(["/PID", &pid, "/T", "/F"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        let _ = child.kill();
        child.wait()
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = child.kill();
        child.wait()
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
