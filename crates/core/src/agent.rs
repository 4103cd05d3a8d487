mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::context::ContextProvider;
use crate::event::AgentEvent;
use crate::executor::CommandExecutor;
use crate::model_client::ModelClient;
pub use builder::AgentBuilder;
use state::AgentState;

type EventHandler = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Knobs of the reasoning loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    /// Maximum number of reasoning steps per task. At least 1.
    pub max_iterations: usize,
    /// Deadline of every model call.
    pub llm_timeout: Duration,
}

impl AgentSettings {
    /// Returns settings with out-of-range values replaced.
    ///
    /// A zero step budget becomes 1, and a zero timeout becomes the
    /// default timeout.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            max_iterations: self.max_iterations.max(1),
            llm_timeout: if self.llm_timeout.is_zero() {
                defaults.llm_timeout
            } else {
                self.llm_timeout
            },
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            llm_timeout: Duration::from_secs(30),
        }
    }
}

/// A troubleshooting agent.
///
/// The agent holds only shared, read-only parts: the model client, the
/// command executor, the context provider and the settings. Every call to
/// [`Agent::solve`] owns its own loop state, so one agent can serve many
/// tasks concurrently. Cloning is cheap.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

pub(crate) struct AgentInner {
    model_client: ModelClient,
    executor: Arc<dyn CommandExecutor>,
    context: Arc<dyn ContextProvider>,
    settings: AgentSettings,
    on_event: Option<EventHandler>,
}

impl AgentInner {
    #[inline]
    fn emit(&self, event: AgentEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(&event);
        }
    }
}

impl Agent {
    /// Works on `query` until an answer is available.
    ///
    /// This method always produces an answer. Model timeouts, model
    /// failures and unparsable model output end the task early with an
    /// explanatory answer instead of an error.
    pub async fn solve(&self, query: &str) -> String {
        let span = info_span!("solve");
        async {
            let preview: String = query.chars().take(100).collect();
            info!("solving: {preview}");

            let state = AgentState::new(query, &self.inner);
            let answer = state.run(&self.inner).await;

            info!("solved with an answer of {} chars", answer.chars().count());
            self.inner.emit(AgentEvent::Finished {
                answer: answer.clone(),
            });
            answer
        }
        .instrument(span)
        .await
    }

    /// Returns the settings of this agent.
    #[inline]
    pub fn settings(&self) -> &AgentSettings {
        &self.inner.settings
    }
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            executor,
            context,
            settings,
            on_event,
        } = builder;

        let inner = AgentInner {
            model_client,
            executor,
            context,
            settings: settings.sanitized(),
            on_event,
        };
        Self {
            inner: Arc::new(inner),
        }
    }
}
