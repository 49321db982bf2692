//! External command execution.
//!
//! The metadata generator and the signing script are the only subprocesses
//! the pipeline starts. Both go through [`CommandRunner`] so the pipeline's
//! decisions can be exercised with a scripted runner instead of real tools.

use crate::error::{PackagerError, Result};
use camino::Utf8PathBuf;
use std::fmt;
use std::io::{self, Read};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// A fully described subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute.
    pub program: Utf8PathBuf,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub working_dir: Utf8PathBuf,
}

impl Invocation {
    /// Start an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<Utf8PathBuf>, working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Short name used in diagnostics (the program's file name).
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.program.file_name().unwrap_or(self.program.as_str())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Runs the invocation to completion and returns its captured output.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// `output.status`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the process cannot be spawned and
    /// [`PackagerError::TimedOut`] if a configured timeout elapses.
    fn run(&self, invocation: &Invocation) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// Without a timeout the runner blocks until the child exits, however long
/// that takes.
///
/// # Examples
///
/// ```no_run
/// use komodo_packager::runner::{CommandRunner, Invocation, SystemCommandRunner};
/// use std::time::Duration;
///
/// let runner = SystemCommandRunner::with_timeout(Duration::from_secs(600));
/// let invocation = Invocation::new("/repo/share/genbuild.sh", "/repo")
///     .arg("/repo/releases/build.txt")
///     .arg("/repo")
///     .arg(".");
/// let output = runner.run(&invocation)?;
/// assert!(output.status.success());
/// # Ok::<(), komodo_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    /// A runner that waits indefinitely for each child.
    #[must_use]
    pub const fn new() -> Self {
        Self { timeout: None }
    }

    /// A runner that kills children still running after `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        log::debug!("running {invocation} in {}", invocation.working_dir);

        let mut cmd = Command::new(invocation.program.as_std_path());
        cmd.args(&invocation.args)
            .current_dir(invocation.working_dir.as_std_path())
            .stdin(Stdio::null());

        match self.timeout {
            None => cmd.output().map_err(PackagerError::from),
            Some(timeout) => run_with_timeout(cmd, invocation, timeout),
        }
    }
}

/// Spawns the command and waits at most `timeout` for it to exit.
///
/// Pipes are drained on background threads so a chatty child cannot block
/// on a full pipe while we wait.
fn run_with_timeout(mut cmd: Command, invocation: &Invocation, timeout: Duration) -> Result<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    match child.wait_timeout(timeout)? {
        Some(status) => Ok(Output {
            status,
            stdout: collect(stdout)?,
            stderr: collect(stderr)?,
        }),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(PackagerError::TimedOut {
                command: invocation.display_name().to_owned(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn collect(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

/// Converts a non-zero exit into [`PackagerError::SubprocessFailed`].
///
/// # Errors
///
/// Returns [`PackagerError::SubprocessFailed`] carrying the exit code and the
/// trimmed stderr when `output.status` is not a success.
pub fn ensure_success(invocation: &Invocation, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(PackagerError::SubprocessFailed {
        command: invocation.display_name().to_owned(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}
