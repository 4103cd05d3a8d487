use super::AgentInner;
use crate::context::{OsInfo, ShellInfo};
use crate::deadline::call_with_deadline;
use crate::decision::{Action, Decision};
use crate::event::AgentEvent;
use crate::fallback;
use crate::history::{History, HistoryEntry};
use crate::prompt::{self, PromptContext};

/// The answer of a task whose model call didn't finish in time.
pub(crate) const TIMEOUT_ANSWER: &str = "The AI assistant timed out while processing \
    your query. The issue might be too complex or the API is slow. Please try \
    again or simplify your query.";

/// Where the loop of a task currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum AgentStage {
    /// Asking the model for the next decision.
    #[default]
    Thinking,
    /// Running the command of the latest decision.
    Acting,
    /// An answer is available.
    Done,
}

/// Loop state of one task.
pub(crate) struct AgentState {
    query: String,
    os_info: OsInfo,
    shell_info: ShellInfo,
    commands: Vec<String>,
    history: History,
    iteration: usize,
    stage: AgentStage,
    answer: Option<String>,
}

impl AgentState {
    pub fn new(query: &str, agent: &AgentInner) -> Self {
        // Environment facts are gathered once per task.
        Self {
            query: query.to_owned(),
            os_info: agent.context.os_info(),
            shell_info: agent.context.shell_info(),
            commands: agent.context.common_commands(),
            history: History::default(),
            iteration: 0,
            stage: AgentStage::default(),
            answer: None,
        }
    }

    pub async fn run(mut self, agent: &AgentInner) -> String {
        loop {
            match self.stage {
                AgentStage::Thinking => self.think(agent).await,
                AgentStage::Acting => self.act(agent).await,
                AgentStage::Done => break,
            }
        }
        self.answer.unwrap_or_default()
    }

    fn finish(&mut self, answer: String) {
        self.answer = Some(answer);
        self.stage = AgentStage::Done;
    }

    async fn think(&mut self, agent: &AgentInner) {
        let max_iterations = agent.settings.max_iterations;
        if self.iteration >= max_iterations {
            warn!("reached {max_iterations} iterations without an answer");
            agent.emit(AgentEvent::BudgetExhausted { max_iterations });
            let answer = fallback::summarize(
                &agent.model_client,
                &self.query,
                &self.history,
                agent.settings.llm_timeout,
            )
            .await;
            self.finish(answer);
            return;
        }

        self.iteration += 1;
        debug!("iteration {}/{max_iterations}", self.iteration);
        agent.emit(AgentEvent::IterationStarted {
            iteration: self.iteration,
            max_iterations,
        });

        let Some(decision) = self.decide(agent).await else {
            return;
        };
        debug!(
            "decided to {}: {}",
            decision.action.name(),
            decision.thought.chars().take(50).collect::<String>()
        );

        self.history.push(HistoryEntry::new(self.iteration, &decision));

        match decision.action {
            Action::FinalAnswer(answer) => {
                info!("got a final answer on iteration {}", self.iteration);
                self.finish(answer);
            }
            Action::ExecuteCommand(command) if command.trim().is_empty() => {
                warn!("model asked to execute a command but gave none");
                agent.emit(AgentEvent::EmptyCommand);
            }
            Action::ExecuteCommand(_) => {
                self.stage = AgentStage::Acting;
            }
            Action::Unknown(action) => {
                warn!("unknown action: {action}");
                agent.emit(AgentEvent::UnknownAction { action });
            }
        }
    }

    /// Calls the model under the deadline and parses its decision.
    ///
    /// Returns `None` if the task has ended with an explanatory answer.
    async fn decide(&mut self, agent: &AgentInner) -> Option<Decision> {
        let ctx = PromptContext {
            query: &self.query,
            os_info: &self.os_info,
            shell_info: &self.shell_info,
            commands: &self.commands,
        };
        let prompt = prompt::reasoning_prompt(&ctx, &self.history.render());

        debug!("calling model");
        let limit = agent.settings.llm_timeout;
        let result =
            call_with_deadline(limit, agent.model_client.invoke(&prompt)).await;

        let content = match result {
            Ok(Ok(content)) => content,
            Ok(Err(err)) => {
                error!("model call failed on iteration {}: {err}", self.iteration);
                agent.emit(AgentEvent::ModelFailed {
                    reason: err.to_string(),
                });
                self.finish(failure_answer(&err));
                return None;
            }
            Err(_) => {
                warn!(
                    "model timed out after {}s on iteration {}",
                    limit.as_secs(),
                    self.iteration
                );
                agent.emit(AgentEvent::ModelTimedOut {
                    seconds: limit.as_secs(),
                });
                self.finish(TIMEOUT_ANSWER.to_owned());
                return None;
            }
        };
        debug!("model responded with {} chars", content.len());

        match Decision::parse(&content) {
            Ok(decision) => Some(decision),
            Err(err) => {
                error!(
                    "invalid decision on iteration {}: {err}, response: {}",
                    self.iteration,
                    err.excerpt()
                );
                agent.emit(AgentEvent::InvalidDecision {
                    reason: err.to_string(),
                });
                self.finish(failure_answer(&err));
                None
            }
        }
    }

    async fn act(&mut self, agent: &AgentInner) {
        self.stage = AgentStage::Thinking;
        let Some(command) = self.history.pending_command().map(str::to_owned)
        else {
            return;
        };

        info!("executing command: {command}");
        agent.emit(AgentEvent::CommandDispatched {
            command: command.clone(),
        });

        let outcome = agent.executor.execute(&command, &self.os_info).await;
        debug!(
            "command finished: success={}, blocked={}",
            outcome.success(),
            outcome.is_blocked()
        );

        if !self.history.complete_last(&outcome) {
            warn!("no pending step for the outcome of `{command}`");
        }
        agent.emit(AgentEvent::CommandFinished { command, outcome });
    }
}

fn failure_answer(err: &dyn std::fmt::Display) -> String {
    format!("I encountered an error while processing your query: {err}")
}
