use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use rabbit_core::{CommandExecutor, CommandOutcome, OsInfo};
use tokio::sync::oneshot;

type RequestHandler = Arc<dyn Fn(CommandApproval) + Send + Sync>;

#[derive(Debug)]
struct ApprovalResult {
    approved: bool,
    why: Option<String>,
}

/// A pending request to run a command.
///
/// Dropping the approval without answering rejects the command.
pub struct CommandApproval {
    command: String,
    result_tx: oneshot::Sender<ApprovalResult>,
}

impl CommandApproval {
    /// Returns the command line awaiting approval.
    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Approves the request.
    #[inline]
    pub fn approve(self) {
        self.result_tx
            .send(ApprovalResult {
                approved: true,
                why: None,
            })
            .ok();
    }

    /// Rejects the request with an optional reason.
    #[inline]
    pub fn reject(self, reason: Option<String>) {
        self.result_tx
            .send(ApprovalResult {
                approved: false,
                why: reason,
            })
            .ok();
    }
}

impl Debug for CommandApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandApproval")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl Display for CommandApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// An executor that asks for approval before running each command.
///
/// Without a request handler every command is approved.
pub struct ApprovalGate<E> {
    inner: E,
    on_request: Option<RequestHandler>,
}

impl<E> ApprovalGate<E> {
    /// Wraps `inner` in an auto-approving gate.
    #[inline]
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            on_request: None,
        }
    }

    /// Attaches a callback to be invoked for each command to approve.
    #[inline]
    pub fn on_request(
        mut self,
        on_request: impl Fn(CommandApproval) + Send + Sync + 'static,
    ) -> Self {
        self.on_request = Some(Arc::new(on_request));
        self
    }
}

#[async_trait]
impl<E: CommandExecutor> CommandExecutor for ApprovalGate<E> {
    async fn execute(&self, command: &str, os: &OsInfo) -> CommandOutcome {
        let Some(on_request) = &self.on_request else {
            return self.inner.execute(command, os).await;
        };

        let (result_tx, result_rx) = oneshot::channel();
        on_request(CommandApproval {
            command: command.to_owned(),
            result_tx,
        });

        match result_rx.await {
            Ok(ApprovalResult { approved: true, .. }) => {
                self.inner.execute(command, os).await
            }
            Ok(ApprovalResult { why, .. }) => {
                info!("user rejected `{command}`");
                let reason = why.unwrap_or_else(|| "User declined".to_owned());
                CommandOutcome::blocked(format!("Command rejected: {reason}"))
            }
            Err(_) => {
                warn!("approval for `{command}` was dropped");
                CommandOutcome::blocked("Command rejected: no answer")
            }
        }
    }
}
