use std::time::Duration;

use rabbit_core::{Agent, AgentBuilder, AgentEvent, AgentSettings};
use rabbit_model::ModelProvider;

use crate::context::SystemContext;
use crate::executor::{ApprovalGate, CommandApproval, ShellExecutor};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    command_timeout: Duration,
    on_command_request: Option<Box<dyn Fn(CommandApproval) + Send + Sync>>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self {
            agent_builder,
            command_timeout: Duration::from_secs(30),
            on_command_request: None,
        }
    }

    /// Sets the reasoning loop settings.
    #[inline]
    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.agent_builder = self.agent_builder.with_settings(settings);
        self
    }

    /// Sets how long a single command may run.
    #[inline]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Attaches a callback to be invoked with progress events.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_event(on_event);
        self
    }

    /// Attaches a callback to be invoked when a command needs approval.
    ///
    /// Without this callback, every command runs without asking.
    #[inline]
    pub fn on_command_request(
        mut self,
        on_command_request: impl Fn(CommandApproval) + Send + Sync + 'static,
    ) -> Self {
        self.on_command_request = Some(Box::new(on_command_request));
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let Self {
            agent_builder,
            command_timeout,
            on_command_request,
        } = self;

        let mut executor =
            ApprovalGate::new(ShellExecutor::with_timeout(command_timeout));
        if let Some(on_command_request) = on_command_request {
            executor = executor.on_request(on_command_request);
        }

        let agent = agent_builder
            .with_context(SystemContext::detect())
            .with_executor(executor)
            .build();

        Session { agent }
    }
}

/// A troubleshooting session on the local machine.
///
/// The session holds a fully configured agent that runs commands through
/// the user's shell, and it is basically a wrapper around [`Agent`].
#[derive(Clone)]
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Works on a problem description until an answer is available.
    #[inline]
    pub async fn solve(&self, query: &str) -> String {
        self.agent.solve(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rabbit_test_model::TestModelProvider;

    use super::*;

    fn execute(command: &str) -> String {
        format!(
            r#"{{"thought": "look", "action": "execute_command", "command": "{command}"}}"#
        )
    }

    #[tokio::test]
    async fn test_rejected_command() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response(&execute("echo hi"));
        provider.add_text_response(
            r#"{"action": "final_answer", "answer": "stopped"}"#,
        );

        let requested = Arc::new(Mutex::new(Vec::new()));
        let session = SessionBuilder::with_model_provider(provider.clone())
            .on_command_request({
                let requested = Arc::clone(&requested);
                move |approval: CommandApproval| {
                    requested.lock().unwrap().push(approval.command().to_owned());
                    approval.reject(None);
                }
            })
            .build();

        assert_eq!(session.solve("say hi").await, "stopped");
        assert_eq!(*requested.lock().unwrap(), ["echo hi"]);

        let second = provider.requests()[1]
            .last_user_text()
            .unwrap_or_default()
            .to_owned();
        assert!(second.contains("Command: echo hi\nSuccess: false\n"));
        assert!(second.contains("Error: Command rejected: User declined"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_auto_approved_command() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response(&execute("echo rabbit"));
        provider.add_text_response(
            r#"{"action": "final_answer", "answer": "done"}"#,
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let session = SessionBuilder::with_model_provider(provider.clone())
            .with_settings(AgentSettings {
                max_iterations: 3,
                ..Default::default()
            })
            .on_event({
                let events = Arc::clone(&events);
                move |event: &AgentEvent| events.lock().unwrap().push(event.clone())
            })
            .build();

        assert_eq!(session.solve("echo").await, "done");
        assert!(events.lock().unwrap().iter().any(|event| matches!(
            event,
            AgentEvent::CommandFinished { outcome, .. }
                if outcome.success() && outcome.output() == "rabbit\n"
        )));
    }
}
