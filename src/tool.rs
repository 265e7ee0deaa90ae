//! External tool invocation behind a backend trait.
//!
//! The distortion, caption-compositing, assembly, and caption-generation
//! steps all run external executables. Every invocation goes through
//! [`ToolRunner`] so stage logic stays testable without the tools
//! installed, mirroring how image work hides behind a backend elsewhere.
//!
//! ## No shell, ever
//!
//! An [`Invocation`] is a program plus an argument *array*. Arguments are
//! passed to the OS verbatim — caption text containing quotes, backticks,
//! or `$(...)` cannot break out of its argument slot because no shell
//! string is ever built.
//!
//! ## Exit status is authoritative
//!
//! A non-zero exit is an error carrying the program name, status code, and
//! captured stderr. Callers decide whether that is fatal (it is, for every
//! pipeline stage).

use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// A single external command: program, argument array, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Directory the tool runs in. Tools that write relative output
    /// (the distortion tool's indexed frames) land inside the per-run
    /// workspace because of this.
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stdout_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Trait for running external commands.
///
/// The production implementation is [`CommandRunner`]. Tests use the
/// recording mock in [`tests`].
pub trait ToolRunner {
    /// Run the command to completion. `Ok` iff the process exited zero.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Production runner on `std::process::Command`.
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| ToolError::Launch {
            program: invocation.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                program: invocation.program.clone(),
                status: output
                    .status
                    .code()
                    .map(|c| format!("code {c}"))
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
