use std::env;
use std::io;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use rabbit_core::deadline::call_with_deadline;
use rabbit_core::{CommandExecutor, CommandOutcome, OsInfo};
use tokio::process::Command;

/// An executor that runs commands through the user's shell.
///
/// Standard output and standard error are captured separately. A command
/// that doesn't finish within the timeout is killed.
#[derive(Clone, Debug)]
pub struct ShellExecutor {
    timeout: Duration,
}

impl ShellExecutor {
    /// Creates a shell executor with the default 30 seconds timeout.
    #[inline]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a shell executor with the specified timeout.
    #[inline]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ShellExecutor {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str, _os: &OsInfo) -> CommandOutcome {
        // Dropping the output future kills the child.
        let result =
            call_with_deadline(self.timeout, run_command_line(command)).await;
        match result {
            Ok(Ok(output)) => outcome_from_output(output),
            Ok(Err(err)) => {
                warn!("failed to spawn `{command}`: {err}");
                CommandOutcome::failed("", format!("Failed to run command: {err}"))
            }
            Err(_) => {
                warn!("`{command}` timed out");
                CommandOutcome::failed(
                    "",
                    format!(
                        "Command timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                )
            }
        }
    }
}

#[cfg(not(windows))]
#[inline]
fn create_command_with_inferred_shell() -> Command {
    let shell = env::var_os("SHELL")
        .filter(|shell| !shell.is_empty())
        .unwrap_or_else(|| "/bin/sh".into());
    let mut command = Command::new(shell);
    command.arg("-c");
    command
}

#[cfg(windows)]
#[inline]
fn create_command_with_inferred_shell() -> Command {
    let shell = env::var_os("COMSPEC").unwrap_or_else(|| "cmd".into());
    let mut command = Command::new(shell);
    command.arg("/C");
    command
}

#[inline]
async fn run_command_line(cmdline: &str) -> Result<Output, io::Error> {
    create_command_with_inferred_shell()
        .arg(cmdline)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
}

fn outcome_from_output(output: Output) -> CommandOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if output.status.success() {
        return CommandOutcome::succeeded(stdout);
    }

    let error = if stderr.trim().is_empty() {
        format!("Command exited with {}", output.status)
    } else {
        stderr
    };
    CommandOutcome::failed(stdout, error)
}
