//! External process execution.
//!
//! Every system utility this tool drives (tar, scp, lvm tooling, parted, ...)
//! goes through [`CommandRunner`], so the orchestration layer always sees the
//! exit status and tests can substitute a recording runner.

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, RootfsError};

/// A single program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the child's standard input.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn into_failure(self, program: &str) -> RootfsError {
        RootfsError::CommandFailed {
            program: program.to_string(),
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion and capture its output, whatever the exit status.
    async fn output(&self, cmd: &Cmd) -> Result<CommandOutput>;

    /// Resolve `program` on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run `cmd` and fail with [`RootfsError::CommandFailed`] on a non-zero exit.
    /// Returns captured stdout.
    async fn run(&self, cmd: Cmd) -> Result<String> {
        let output = self.output(&cmd).await?;
        if !output.success() {
            return Err(output.into_failure(&cmd.program));
        }
        Ok(output.stdout)
    }

    /// Fail with [`RootfsError::ToolMissing`] unless `program` is installed.
    fn require(&self, program: &str, hint: &str) -> Result<PathBuf> {
        self.locate(program).ok_or_else(|| RootfsError::ToolMissing {
            tool: program.to_string(),
            hint: hint.to_string(),
        })
    }
}

/// Runs commands on the host with tokio's process support.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, cmd: &Cmd) -> Result<CommandOutput> {
        debug!("Running: {}", cmd);

        let mut command = tokio::process::Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });

        let spawn_err = |source| RootfsError::Spawn {
            program: cmd.program.clone(),
            source,
        };

        let mut child = command.spawn().map_err(spawn_err)?;

        if let Some(input) = &cmd.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                // A child that exits before reading its input reports the
                // real failure through its exit status.
                match pipe.write_all(input.as_bytes()).await {
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!("{} closed its input early", cmd.program);
                    }
                    result => result.map_err(spawn_err)?,
                }
                // Dropping the pipe closes it so the child sees EOF.
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} exited with {:?}", cmd.program, result.code);
        Ok(result)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
