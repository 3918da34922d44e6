//! External process execution.
//!
//! Commands are described as structured argv values ([`CommandLine`]) rather
//! than shell strings, so components can build them without quoting concerns
//! and tests can assert on them without spawning anything (see
//! [`crate::fakes::FakeRunner`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{DiffError, Result};

/// A program invocation: executable, arguments, and optional working
/// directory. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from this directory instead of the process cwd.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status (0 = success, -1 = terminated by signal).
    pub status: i32,

    /// Captured stdout, trimmed.
    pub stdout: String,

    /// Captured stderr, trimmed.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes external commands.
///
/// The trait seam exists so the git/gradle/renderer plumbing can be exercised
/// in tests without spawning processes.
pub trait ProcessRunner {
    /// Run a command with output streamed to the caller's stdio. Fails with
    /// [`DiffError::CommandFailed`] on a non-zero exit.
    fn run(&self, command: &CommandLine) -> Result<()>;

    /// Run a command and return only its exit status. Never fails on a
    /// non-zero exit.
    fn status(&self, command: &CommandLine) -> Result<i32>;

    /// Run a command and capture its output. Never fails on a non-zero exit.
    fn capture(&self, command: &CommandLine) -> Result<CommandOutput>;

    /// Like [`ProcessRunner::capture`], but fails with
    /// [`DiffError::CommandFailed`] carrying the captured stderr on a
    /// non-zero exit.
    fn capture_checked(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = self.capture(command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(DiffError::CommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: output.stderr,
            })
        }
    }
}

/// Real process runner over `std::process::Command`.
///
/// Execution is strictly sequential; every invocation blocks until the child
/// exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(command: &CommandLine) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(&command.args);
        if let Some(cwd) = command.cwd() {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<()> {
        debug!(command = %command, "running");
        let status = Self::command(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(DiffError::CommandFailed {
                command: command.to_string(),
                status: status.code().unwrap_or(-1),
                stderr: String::new(),
            })
        }
    }

    fn status(&self, command: &CommandLine) -> Result<i32> {
        debug!(command = %command, "running (status only)");
        let output = Self::command(command).output()?;
        Ok(output.status.code().unwrap_or(-1))
    }

    fn capture(&self, command: &CommandLine) -> Result<CommandOutput> {
        debug!(command = %command, "running (captured)");
        let output = Self::command(command).output()?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
