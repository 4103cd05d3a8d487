use crate::executor::CommandOutcome;

/// Progress notifications emitted while the agent works on a task.
///
/// Events are informational only. Observers cannot influence the loop
/// through them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// A new reasoning step is about to call the model.
    IterationStarted {
        /// 1-based index of the step.
        iteration: usize,
        /// The step budget of this task.
        max_iterations: usize,
    },
    /// A command was handed to the executor.
    CommandDispatched {
        /// The command line.
        command: String,
    },
    /// The executor reported back.
    CommandFinished {
        /// The command line.
        command: String,
        /// What happened.
        outcome: CommandOutcome,
    },
    /// The model chose an action the agent doesn't know.
    UnknownAction {
        /// The action name as the model wrote it.
        action: String,
    },
    /// The model chose to run a command but didn't name one.
    EmptyCommand,
    /// A model call didn't finish in time.
    ModelTimedOut {
        /// The limit in seconds.
        seconds: u64,
    },
    /// A model call failed.
    ModelFailed {
        /// Human-readable failure description.
        reason: String,
    },
    /// The model output could not be turned into a decision.
    InvalidDecision {
        /// Human-readable failure description.
        reason: String,
    },
    /// The step budget ran out and the agent is summarizing.
    BudgetExhausted {
        /// The step budget of this task.
        max_iterations: usize,
    },
    /// The task is over.
    Finished {
        /// The answer returned to the caller.
        answer: String,
    },
}
