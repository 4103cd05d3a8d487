//! The ordered record of reasoning steps within one task.

use crate::decision::{Action, Decision};
use crate::executor::CommandOutcome;

/// Rendered in place of an empty history.
pub const EMPTY_HISTORY: &str =
    "No previous actions yet. This is your first step.";

/// Maximum characters of command output kept in an entry.
pub const STORED_OUTPUT_CHARS: usize = 1000;
/// Maximum characters of command error kept in an entry.
pub const STORED_ERROR_CHARS: usize = 500;
/// Maximum characters of command output shown to the model.
pub const RENDERED_OUTPUT_CHARS: usize = 500;
/// Maximum characters of command error shown to the model.
pub const RENDERED_ERROR_CHARS: usize = 200;

/// Returns the longest prefix of `text` with at most `max_chars` chars.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A [`CommandOutcome`] as stored in the history, with bounded text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedOutcome {
    success: bool,
    blocked: bool,
    output: String,
    error: String,
}

impl RecordedOutcome {
    fn new(outcome: &CommandOutcome) -> Self {
        Self {
            success: outcome.success(),
            blocked: outcome.is_blocked(),
            output: truncate_chars(outcome.output(), STORED_OUTPUT_CHARS)
                .to_owned(),
            error: truncate_chars(outcome.error(), STORED_ERROR_CHARS)
                .to_owned(),
        }
    }

    /// Returns `true` if the command ran and succeeded.
    #[inline]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Returns `true` if the command was refused before running.
    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Returns the stored output.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the stored error.
    #[inline]
    pub fn error(&self) -> &str {
        &self.error
    }
}

/// The command side of a history entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    /// The step ran no command.
    None,
    /// The command is dispatched and its outcome hasn't arrived yet.
    Pending {
        /// The command line.
        command: String,
    },
    /// The command has an outcome.
    Completed {
        /// The command line.
        command: String,
        /// What happened.
        outcome: RecordedOutcome,
    },
}

/// One reasoning step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    iteration: usize,
    thought: String,
    action: String,
    observation: Observation,
}

impl HistoryEntry {
    /// Records `decision` as the step `iteration`.
    ///
    /// A non-empty command starts out pending.
    pub fn new(iteration: usize, decision: &Decision) -> Self {
        let observation = match &decision.action {
            Action::ExecuteCommand(command) if !command.trim().is_empty() => {
                Observation::Pending {
                    command: command.clone(),
                }
            }
            _ => Observation::None,
        };
        Self {
            iteration,
            thought: decision.thought.clone(),
            action: decision.action.name().to_owned(),
            observation,
        }
    }

    /// Returns the 1-based step index.
    #[inline]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Returns the model's reasoning.
    #[inline]
    pub fn thought(&self) -> &str {
        &self.thought
    }

    /// Returns the action name.
    #[inline]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the command this step ran or is about to run.
    pub fn command(&self) -> Option<&str> {
        match &self.observation {
            Observation::None => None,
            Observation::Pending { command }
            | Observation::Completed { command, .. } => Some(command),
        }
    }

    /// Returns the recorded outcome, if any.
    pub fn outcome(&self) -> Option<&RecordedOutcome> {
        match &self.observation {
            Observation::Completed { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Returns the command side of this step.
    #[inline]
    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    /// Attaches the outcome of the pending command.
    ///
    /// Returns `false` and leaves the entry untouched if no command is
    /// pending, which includes entries that already have an outcome.
    pub fn complete(&mut self, outcome: &CommandOutcome) -> bool {
        let Observation::Pending { command } = &mut self.observation else {
            return false;
        };
        self.observation = Observation::Completed {
            command: std::mem::take(command),
            outcome: RecordedOutcome::new(outcome),
        };
        true
    }

    fn render_into(&self, lines: &mut Vec<String>) {
        lines.push(format!("\n--- Iteration {} ---", self.iteration));
        lines.push(format!("Thought: {}", self.thought));
        lines.push(format!("Action: {}", self.action));

        let Some(command) = self.command() else {
            return;
        };
        lines.push(format!("Command: {command}"));

        let outcome = self.outcome();
        let success = outcome.is_some_and(RecordedOutcome::success);
        lines.push(format!("Success: {success}"));

        let Some(outcome) = outcome else {
            return;
        };
        if !outcome.output.is_empty() {
            let output = truncate_chars(&outcome.output, RENDERED_OUTPUT_CHARS);
            lines.push(format!("Output: {output}"));
        }
        if !outcome.error.is_empty() {
            let error = truncate_chars(&outcome.error, RENDERED_ERROR_CHARS);
            lines.push(format!("Error: {error}"));
        }
    }
}

/// The history of one task. It only grows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Appends a step.
    #[inline]
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Attaches `outcome` to the latest step.
    ///
    /// See [`HistoryEntry::complete`].
    pub fn complete_last(&mut self, outcome: &CommandOutcome) -> bool {
        self.entries
            .last_mut()
            .is_some_and(|entry| entry.complete(outcome))
    }

    /// Returns the command of the latest step if it is still pending.
    pub fn pending_command(&self) -> Option<&str> {
        match self.entries.last()?.observation() {
            Observation::Pending { command } => Some(command),
            _ => None,
        }
    }

    /// Returns all steps in order.
    #[inline]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns the number of steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no step has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the history as the plain-text transcript shown to the model.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_HISTORY.to_owned();
        }
        let mut lines = Vec::new();
        for entry in &self.entries {
            entry.render_into(&mut lines);
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execute(thought: &str, command: &str) -> Decision {
        Decision {
            thought: thought.to_owned(),
            action: Action::ExecuteCommand(command.to_owned()),
        }
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(History::default().render(), EMPTY_HISTORY);
    }

    #[test]
    fn test_render_steps() {
        let mut history = History::default();
        history.push(HistoryEntry::new(1, &execute("check disk", "df -h")));
        assert_eq!(history.pending_command(), Some("df -h"));
        assert!(history.complete_last(&CommandOutcome::succeeded("/ 100%")));
        assert_eq!(history.pending_command(), None);

        history.push(HistoryEntry::new(
            2,
            &Decision {
                thought: "done".to_owned(),
                action: Action::FinalAnswer("Disk is full".to_owned()),
            },
        ));

        let expected = "\n--- Iteration 1 ---\n\
            Thought: check disk\n\
            Action: execute_command\n\
            Command: df -h\n\
            Success: true\n\
            Output: / 100%\n\
            \n--- Iteration 2 ---\n\
            Thought: done\n\
            Action: final_answer";
        assert_eq!(history.render(), expected);
    }

    #[test]
    fn test_render_failures() {
        let mut history = History::default();
        history.push(HistoryEntry::new(1, &execute("try", "rm -rf /")));
        // Rendering before the outcome arrives.
        assert!(history.render().ends_with("Command: rm -rf /\nSuccess: false"));

        history.complete_last(&CommandOutcome::blocked("not permitted"));
        assert!(
            history
                .render()
                .ends_with("Success: false\nError: not permitted")
        );
        assert!(history.entries()[0].outcome().unwrap().is_blocked());
    }

    #[test]
    fn test_empty_command_has_no_observation() {
        let mut history = History::default();
        history.push(HistoryEntry::new(1, &execute("hmm", "  ")));
        assert_eq!(history.entries()[0].observation(), &Observation::None);
        assert!(!history.complete_last(&CommandOutcome::succeeded("x")));
        assert!(!history.render().contains("Command:"));
    }

    #[test]
    fn test_outcome_attached_once() {
        let mut entry = HistoryEntry::new(1, &execute("check", "uptime"));
        assert!(entry.complete(&CommandOutcome::succeeded("first")));
        assert!(!entry.complete(&CommandOutcome::succeeded("second")));
        assert_eq!(entry.outcome().unwrap().output(), "first");
    }

    #[test]
    fn test_truncation() {
        let mut entry = HistoryEntry::new(1, &execute("logs", "journalctl"));
        entry.complete(&CommandOutcome::failed(
            "é".repeat(1500),
            "x".repeat(800),
        ));

        let outcome = entry.outcome().unwrap();
        assert_eq!(outcome.output().chars().count(), STORED_OUTPUT_CHARS);
        assert_eq!(outcome.error().chars().count(), STORED_ERROR_CHARS);

        let mut history = History::default();
        history.push(entry);
        let rendered = history.render();
        let output_line = format!("Output: {}\n", "é".repeat(500));
        let error_line = format!("Error: {}", "x".repeat(200));
        assert!(rendered.contains(&output_line));
        assert!(rendered.ends_with(&error_line));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 0), "");
    }
}
