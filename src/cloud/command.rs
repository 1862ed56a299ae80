//! External command execution
//!
//! Every cloud operation shells out to a CLI (`gsutil`, `gcloud`,
//! `tensorboard`). [`CommandRunner`] is the seam between the job client and
//! the processes it starts, so the client can be driven by scripted output
//! in tests.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{PanelError, Result};

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal
    pub code: Option<i32>,
    /// Standard output (lossy UTF-8)
    pub stdout: String,
    /// Standard error (lossy UTF-8)
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert into trimmed stdout, or a `CommandFailed` error
    pub fn into_stdout(self, program: &str) -> Result<String> {
        if self.success() {
            Ok(self.stdout.trim().to_string())
        } else {
            Err(PanelError::command_failed(
                program,
                self.code,
                self.stderr.trim(),
            ))
        }
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program to completion and capture its output
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Start a program in the background without waiting for it
    async fn spawn_detached(&self, program: &str, args: &[String]) -> Result<()>;
}

/// Runner backed by real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| PanelError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success() {
            tracing::warn!(
                program,
                code = ?result.code,
                stderr = %result.stderr.trim(),
                "command failed"
            );
        }

        Ok(result)
    }

    async fn spawn_detached(&self, program: &str, args: &[String]) -> Result<()> {
        tracing::debug!(program, ?args, "spawning background command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| PanelError::Spawn {
                program: program.to_string(),
                source,
            })?;

        tracing::info!(program, pid = ?child.id(), "background command started");
        Ok(())
    }
}

/// Build an owned argument list from string slices
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_stdout() {
        assert_eq!(
            CommandOutput::ok("RUNNING\n").into_stdout("gcloud").unwrap(),
            "RUNNING"
        );

        let err = CommandOutput::failed(1, "NOT_FOUND\n")
            .into_stdout("gcloud")
            .unwrap_err();
        assert_eq!(err.stderr(), Some("NOT_FOUND"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let runner = SystemRunner;
        let out = runner
            .output("sh", &args(["-c", "echo hello; echo oops >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemRunner;
        let err = runner
            .output("definitely-not-a-real-program-xyz", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Spawn { .. }));
    }
}
