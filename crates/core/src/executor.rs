//! Command execution seam.

use async_trait::async_trait;

use crate::context::OsInfo;

/// The observed result of running (or refusing to run) a command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CommandOutcome {
    success: bool,
    output: String,
    error: String,
    blocked: bool,
}

impl CommandOutcome {
    /// Creates an outcome for a command that ran and succeeded.
    pub fn succeeded<S: Into<String>>(output: S) -> Self {
        Self {
            success: true,
            output: output.into(),
            ..Default::default()
        }
    }

    /// Creates an outcome for a command that ran and failed.
    pub fn failed<O: Into<String>, E: Into<String>>(output: O, error: E) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: error.into(),
            blocked: false,
        }
    }

    /// Creates an outcome for a command that was not allowed to run.
    pub fn blocked<S: Into<String>>(reason: S) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: reason.into(),
            blocked: true,
        }
    }

    /// Returns `true` if the command ran and succeeded.
    #[inline]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Returns the captured standard output.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the captured error text, or the reason for blocking.
    #[inline]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Returns `true` if the command was refused before running.
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}

/// Runs shell commands on behalf of the agent.
///
/// Implementations own every policy about *whether* a command may run,
/// such as safety checks and user approval, and report a refusal as a
/// [`CommandOutcome::blocked`] outcome instead of an error. The agent
/// loop treats every outcome as an observation and keeps going.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` and reports what happened.
    async fn execute(&self, command: &str, os: &OsInfo) -> CommandOutcome;
}

/// An executor that refuses every command.
///
/// Agents built without an executor use this one.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledExecutor;

#[async_trait]
impl CommandExecutor for DisabledExecutor {
    async fn execute(&self, command: &str, _os: &OsInfo) -> CommandOutcome {
        debug!("refusing `{command}`: command execution is disabled");
        CommandOutcome::blocked("Command execution is disabled")
    }
}
