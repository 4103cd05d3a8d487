use std::sync::Arc;
use std::time::Duration;

use rabbit_model::ModelProvider;

use super::{Agent, AgentSettings, EventHandler};
use crate::context::{ContextProvider, StaticContext};
use crate::event::AgentEvent;
use crate::executor::{CommandExecutor, DisabledExecutor};
use crate::model_client::ModelClient;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) executor: Arc<dyn CommandExecutor>,
    pub(crate) context: Arc<dyn ContextProvider>,
    pub(crate) settings: AgentSettings,
    pub(crate) on_event: Option<EventHandler>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    ///
    /// Unless configured otherwise, the agent refuses to run commands and
    /// reports an unknown environment.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            executor: Arc::new(DisabledExecutor),
            context: Arc::new(StaticContext::default()),
            settings: AgentSettings::default(),
            on_event: None,
        }
    }

    /// Sets the command executor.
    #[inline]
    pub fn with_executor<E: CommandExecutor + 'static>(
        mut self,
        executor: E,
    ) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    /// Sets the environment context provider.
    #[inline]
    pub fn with_context<C: ContextProvider + 'static>(
        mut self,
        context: C,
    ) -> Self {
        self.context = Arc::new(context);
        self
    }

    /// Replaces all settings.
    #[inline]
    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the maximum number of reasoning steps per task.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.settings.max_iterations = max_iterations;
        self
    }

    /// Sets the deadline of every model call.
    #[inline]
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.settings.llm_timeout = timeout;
        self
    }

    /// Attaches a callback to be invoked with progress events.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&AgentEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
