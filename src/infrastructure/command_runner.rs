//! Subprocess invocation of the external tool.
//!
//! Every call spawns exactly one process. On timeout the child is killed
//! and reaped before the error is returned.

use std::future::Future;
use std::io::ErrorKind as IoErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::domain::RunError;

/// Captured result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Runs the external tool with a list of arguments.
///
/// Implementations must not keep shared mutable state between calls.
pub trait CommandRunner: Send + Sync {
    /// Invoke the tool with `args`, giving up after `timeout`.
    fn run(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> impl Future<Output = Result<CommandOutput, RunError>> + Send;
}

/// Check the invocation contract shared by every runner.
///
/// # Errors
/// Returns `RunError::InvalidInvocation` for empty `args` or a zero `timeout`.
pub fn check_invocation(args: &[String], timeout: Duration) -> Result<(), RunError> {
    if args.is_empty() {
        return Err(RunError::InvalidInvocation {
            reason: "argument list is empty".into(),
        });
    }
    if timeout.is_zero() {
        return Err(RunError::InvalidInvocation {
            reason: "timeout must be positive".into(),
        });
    }
    Ok(())
}

/// Runner backed by a real program on `PATH` (or an absolute path).
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn_error(&self, err: &std::io::Error) -> RunError {
        if err.kind() == IoErrorKind::NotFound {
            RunError::NotFound {
                program: self.program.clone(),
            }
        } else {
            RunError::Io {
                message: format!("Failed to spawn {}: {err}", self.program),
            }
        }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput, RunError> {
        check_invocation(args, timeout)?;

        tracing::debug!(program = %self.program, ?args, "Invoking tool");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill().await;
            return Err(RunError::Io {
                message: "child pipes were not captured".into(),
            });
        };

        let mut out = Vec::new();
        let mut err = Vec::new();
        let completed = tokio::time::timeout(timeout, async {
            tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err)
            )
        })
        .await;

        let status = match completed {
            Ok(Ok((status, _, _))) => status,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(RunError::Io {
                    message: format!("Failed to collect output of {}: {e}", self.program),
                });
            }
            Err(_) => {
                // kill() also waits, so no zombie outlives the call.
                if let Err(e) = child.kill().await {
                    tracing::warn!(program = %self.program, error = %e, "Failed to kill timed out process");
                }
                tracing::warn!(program = %self.program, timeout_ms = timeout.as_millis(), "Tool invocation timed out");
                return Err(RunError::TimedOut { timeout });
            }
        };

        let stdout = String::from_utf8_lossy(&out).into_owned();
        let stderr = String::from_utf8_lossy(&err).into_owned();

        match status.code() {
            Some(0) => Ok(CommandOutput {
                stdout,
                stderr,
                exit_code: 0,
            }),
            exit_code => Err(RunError::NonZeroExit { exit_code, stderr }),
        }
    }
}
