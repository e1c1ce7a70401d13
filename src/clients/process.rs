//! External command execution for the deployment CLI.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of trailing output lines kept for diagnostics.
pub const DIAGNOSTIC_LINES: usize = 5;

/// A fully described process launch.
#[derive(Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables; values may be secrets.
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl fmt::Debug for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<_> = self
            .env
            .iter()
            .map(|(key, _)| format!("{key}=[REDACTED]"))
            .collect();
        f.debug_struct("CommandInvocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What a finished process produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Success is decided by the exit code alone.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The last non-empty lines of stderr, or of stdout when stderr is empty.
    pub fn diagnostic(&self, max_lines: usize) -> String {
        let tail = |text: &str| -> Vec<String> {
            let lines: Vec<&str> = text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .collect();
            let start = lines.len().saturating_sub(max_lines);
            lines[start..].iter().map(|line| line.to_string()).collect()
        };

        let lines = tail(&self.stderr);
        let lines = if lines.is_empty() {
            tail(&self.stdout)
        } else {
            lines
        };
        lines.join("\n")
    }
}

/// Failures to run a process at all (as opposed to a non-zero exit).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("cannot start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {}s and was killed", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("'{0}' was killed because the server is shutting down")]
    Cancelled(String),

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        invocation: CommandInvocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// The child is killed when its future is dropped, which covers both the
/// timeout and cancellation paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        invocation: CommandInvocation,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        debug!(?invocation, "Spawning command");

        let child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let output = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(program = %invocation.program, "Command cancelled");
                return Err(CommandError::Cancelled(invocation.program));
            }
            result = tokio::time::timeout(invocation.timeout, child.wait_with_output()) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(source)) => {
                    return Err(CommandError::Io {
                        program: invocation.program,
                        source,
                    });
                }
                Err(_) => {
                    warn!(program = %invocation.program, "Command timed out");
                    return Err(CommandError::Timeout {
                        program: invocation.program,
                        timeout: invocation.timeout,
                    });
                }
            },
        };

        let output = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        info!(program = %invocation.program, exit_code = ?output.exit_code, "Command finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_success_is_exit_code_only() {
        assert!(output(Some(0), "", "ERROR: looks bad but is not").success());
        assert!(!output(Some(1), "deployed successfully", "").success());
        assert!(!output(None, "", "").success());
    }

    #[test]
    fn test_diagnostic_prefers_stderr_tail() {
        let out = output(Some(2), "building\n", "a\n\nb\nc\n  \nd\n");
        assert_eq!(out.diagnostic(2), "c\nd");

        let out = output(Some(2), "step 1\nstep 2\nboom\n", "\n");
        assert_eq!(out.diagnostic(DIAGNOSTIC_LINES), "step 1\nstep 2\nboom");
    }

    #[test]
    fn test_invocation_debug_redacts_env_values() {
        let invocation = CommandInvocation {
            program: "cli".to_string(),
            args: vec!["push".to_string()],
            env: vec![("PLATFORM_TOKEN".to_string(), "s3cret".to_string())],
            cwd: PathBuf::from("/tmp"),
            timeout: Duration::from_secs(1),
        };
        let debug = format!("{invocation:?}");
        assert!(debug.contains("PLATFORM_TOKEN=[REDACTED]"));
        assert!(!debug.contains("s3cret"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_process_in_working_dir_with_env() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = CommandInvocation {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "pwd; echo \"$DEPLOY_TOKEN\"; echo oops >&2; exit 3".to_string(),
            ],
            env: vec![("DEPLOY_TOKEN".to_string(), "tok".to_string())],
            cwd: dir.path().to_path_buf(),
            timeout: Duration::from_secs(10),
        };

        let out = TokioCommandRunner
            .run(invocation, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(out.stdout.contains("tok"));
        let canonical = dir.path().canonicalize().unwrap();
        let name = canonical.file_name().unwrap().to_string_lossy().to_string();
        assert!(out.stdout.contains(&name));
        assert_eq!(out.diagnostic(DIAGNOSTIC_LINES), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let invocation = CommandInvocation {
            program: "sleep".to_string(),
            args: vec!["5".to_string()],
            env: Vec::new(),
            cwd: std::env::temp_dir(),
            timeout: Duration::from_millis(100),
        };
        let err = TokioCommandRunner
            .run(invocation, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let invocation = CommandInvocation {
            program: "sleep".to_string(),
            args: vec!["5".to_string()],
            env: Vec::new(),
            cwd: std::env::temp_dir(),
            timeout: Duration::from_secs(30),
        };
        let err = TokioCommandRunner.run(invocation, &cancel).await.unwrap_err();
        assert!(matches!(err, CommandError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let invocation = CommandInvocation {
            program: "definitely-not-a-real-program-4821".to_string(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: std::env::temp_dir(),
            timeout: Duration::from_secs(1),
        };
        let err = TokioCommandRunner
            .run(invocation, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
