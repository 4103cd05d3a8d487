use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rabbit_test_model::{PresetResponse, TestModelProvider};
use tokio::time::Instant;

use super::state::TIMEOUT_ANSWER;
use crate::fallback::{SUMMARY_LEAD_IN, fallback_message};
use crate::{
    AgentBuilder, AgentEvent, CommandExecutor, CommandOutcome, OsInfo,
    ShellInfo, StaticContext,
};

#[derive(Clone, Default)]
struct ScriptedExecutor {
    outcomes: Arc<Mutex<VecDeque<CommandOutcome>>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    fn with_outcomes(outcomes: impl IntoIterator<Item = CommandOutcome>) -> Self {
        let executor = Self::default();
        executor.outcomes.lock().unwrap().extend(outcomes);
        executor
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &str, _os: &OsInfo) -> CommandOutcome {
        self.commands.lock().unwrap().push(command.to_owned());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutcome::succeeded(""))
    }
}

fn linux() -> StaticContext {
    StaticContext::new(
        OsInfo {
            os_type: "Linux".to_owned(),
            release: "6.8.0".to_owned(),
        },
        ShellInfo {
            shell_type: "bash".to_owned(),
        },
        ["df", "du", "free"],
    )
}

fn execute(thought: &str, command: &str) -> String {
    serde_json::json!({
        "thought": thought,
        "action": "execute_command",
        "command": command,
    })
    .to_string()
}

fn final_answer(answer: &str) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::json!({
            "thought": "done",
            "action": "final_answer",
            "answer": answer,
        })
    )
}

fn prompt_of(provider: &TestModelProvider, idx: usize) -> String {
    provider.requests()[idx]
        .last_user_text()
        .unwrap_or_default()
        .to_owned()
}

type Events = Arc<Mutex<Vec<AgentEvent>>>;

fn recording(builder: AgentBuilder) -> (AgentBuilder, Events) {
    let events = Events::default();
    let builder = builder.on_event({
        let events = Arc::clone(&events);
        move |event: &AgentEvent| events.lock().unwrap().push(event.clone())
    });
    (builder, events)
}

#[tokio::test]
async fn test_disk_full() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&execute("check disk usage", "df -h"));
    provider.add_text_response(&final_answer("Your root partition is full."));
    let executor = ScriptedExecutor::with_outcomes([CommandOutcome::succeeded(
        "/dev/sda1  50G  50G  0  100% /",
    )]);

    let (builder, events) = recording(
        AgentBuilder::with_model_provider(provider.clone())
            .with_executor(executor.clone())
            .with_context(linux()),
    );
    let agent = builder.build();

    let answer = agent.solve("disk is full").await;
    assert_eq!(answer, "Your root partition is full.");
    assert_eq!(provider.request_count(), 2);
    assert_eq!(executor.commands(), ["df -h"]);

    let first = prompt_of(&provider, 0);
    assert!(first.contains("- OS: Linux 6.8.0\n- Shell: bash\n"));
    assert!(first.contains("- Available commands: df, du, free\n"));
    assert!(first.contains("USER QUERY: disk is full\n"));
    assert!(first.contains("No previous actions yet. This is your first step."));

    let second = prompt_of(&provider, 1);
    assert!(second.contains(
        "--- Iteration 1 ---\nThought: check disk usage\n\
        Action: execute_command\nCommand: df -h\nSuccess: true\n\
        Output: /dev/sda1  50G  50G  0  100% /\n"
    ));

    let events = events.lock().unwrap();
    assert_eq!(
        events.as_slice(),
        [
            AgentEvent::IterationStarted {
                iteration: 1,
                max_iterations: 10,
            },
            AgentEvent::CommandDispatched {
                command: "df -h".to_owned(),
            },
            AgentEvent::CommandFinished {
                command: "df -h".to_owned(),
                outcome: CommandOutcome::succeeded(
                    "/dev/sda1  50G  50G  0  100% /"
                ),
            },
            AgentEvent::IterationStarted {
                iteration: 2,
                max_iterations: 10,
            },
            AgentEvent::Finished {
                answer: "Your root partition is full.".to_owned(),
            },
        ]
    );
}

#[tokio::test]
async fn test_blocked_command_continues() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&execute("clean up", "rm -rf /tmp/cache"));
    provider.add_text_response(&final_answer("Clean the cache manually."));
    let executor = ScriptedExecutor::with_outcomes([CommandOutcome::blocked(
        "command not permitted",
    )]);

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_executor(executor.clone())
        .with_context(linux())
        .build();

    let answer = agent.solve("tmp is huge").await;
    assert_eq!(answer, "Clean the cache manually.");
    assert_eq!(executor.commands(), ["rm -rf /tmp/cache"]);
    assert!(prompt_of(&provider, 1).contains(
        "Command: rm -rf /tmp/cache\nSuccess: false\n\
        Error: command not permitted\n"
    ));
}

#[tokio::test]
async fn test_disabled_executor() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&execute("look", "ls"));
    provider.add_text_response(&final_answer("ok"));

    let agent = AgentBuilder::with_model_provider(provider.clone()).build();
    assert_eq!(agent.solve("anything").await, "ok");
    assert!(prompt_of(&provider, 1).contains("Error: Command execution is disabled"));
}

#[tokio::test]
async fn test_output_truncated_in_prompt() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&execute("read logs", "journalctl"));
    provider.add_text_response(&final_answer("done"));
    let executor = ScriptedExecutor::with_outcomes([CommandOutcome::failed(
        "y".repeat(1500),
        "z".repeat(900),
    )]);

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_executor(executor)
        .with_context(linux())
        .build();
    agent.solve("logs").await;

    let second = prompt_of(&provider, 1);
    assert!(second.contains(&format!("Output: {}\n", "y".repeat(500))));
    assert!(!second.contains(&"y".repeat(501)));
    assert!(second.contains(&format!("Error: {}\n", "z".repeat(200))));
    assert!(!second.contains(&"z".repeat(201)));
}

#[tokio::test(start_paused = true)]
async fn test_model_timeout() {
    let mut provider = TestModelProvider::default();
    provider.add_response(
        PresetResponse::with_text(&final_answer("too late"))
            .delayed(Duration::from_secs(3600)),
    );
    let executor = ScriptedExecutor::default();

    let (builder, events) = recording(
        AgentBuilder::with_model_provider(provider.clone())
            .with_executor(executor.clone())
            .with_llm_timeout(Duration::from_secs(30)),
    );
    let agent = builder.build();

    let start = Instant::now();
    let answer = agent.solve("slow").await;
    assert_eq!(answer, TIMEOUT_ANSWER);
    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(provider.request_count(), 1);
    assert!(executor.commands().is_empty());
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&AgentEvent::ModelTimedOut { seconds: 30 })
    );
}

#[tokio::test]
async fn test_model_failure() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_error("service down"));

    let agent = AgentBuilder::with_model_provider(provider.clone()).build();
    let answer = agent.solve("help").await;
    assert_eq!(
        answer,
        "I encountered an error while processing your query: service down"
    );
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_invalid_decision() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response("You should probably run df -h.");
    provider.add_text_response(r#"{"thought": "no action"}"#);
    let executor = ScriptedExecutor::default();

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_executor(executor.clone())
        .build();

    let answer = agent.solve("disk").await;
    assert!(answer.starts_with(
        "I encountered an error while processing your query: invalid JSON"
    ));

    let answer = agent.solve("disk").await;
    assert_eq!(
        answer,
        "I encountered an error while processing your query: \
        missing 'action' field"
    );

    assert_eq!(provider.request_count(), 2);
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn test_unknown_action_and_empty_command() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(
        r#"{"thought": "restart it", "action": "restart_service"}"#,
    );
    provider.add_text_response(&execute("hmm", ""));
    provider.add_text_response(&final_answer("Nothing to do."));
    let executor = ScriptedExecutor::default();

    let (builder, events) = recording(
        AgentBuilder::with_model_provider(provider.clone())
            .with_executor(executor.clone()),
    );
    let agent = builder.build();

    assert_eq!(agent.solve("service down").await, "Nothing to do.");
    assert_eq!(provider.request_count(), 3);
    assert!(executor.commands().is_empty());

    let third = prompt_of(&provider, 2);
    assert!(third.contains(
        "--- Iteration 1 ---\nThought: restart it\nAction: restart_service\n"
    ));
    assert!(third.contains(
        "--- Iteration 2 ---\nThought: hmm\nAction: execute_command\n"
    ));
    assert!(!third.contains("Command:"));

    let events = events.lock().unwrap();
    assert!(events.contains(&AgentEvent::UnknownAction {
        action: "restart_service".to_owned(),
    }));
    assert!(events.contains(&AgentEvent::EmptyCommand));
    assert!(events.contains(&AgentEvent::IterationStarted {
        iteration: 3,
        max_iterations: 10,
    }));
}

#[tokio::test]
async fn test_budget_exhausted_with_summary() {
    let mut provider = TestModelProvider::default();
    for i in 0..3 {
        provider.add_text_response(&execute("dig deeper", &format!("step{i}")));
    }
    provider.add_text_response("Memory pressure is high.");
    let executor = ScriptedExecutor::default();

    let (builder, events) = recording(
        AgentBuilder::with_model_provider(provider.clone())
            .with_executor(executor.clone())
            .with_max_iterations(3),
    );
    let agent = builder.build();

    let answer = agent.solve("why slow").await;
    assert_eq!(answer, format!("{SUMMARY_LEAD_IN}Memory pressure is high."));
    assert_eq!(provider.request_count(), 4);
    assert_eq!(executor.commands(), ["step0", "step1", "step2"]);

    let summary_prompt = prompt_of(&provider, 3);
    assert!(summary_prompt.contains("Query: why slow\n"));
    assert!(summary_prompt.contains("--- Iteration 3 ---"));
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&AgentEvent::BudgetExhausted { max_iterations: 3 })
    );
}

#[tokio::test]
async fn test_budget_exhausted_without_summary() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(r#"{"action": "wait"}"#);
    provider.add_text_response(&execute("check", "uptime"));
    provider.add_text_response(&execute("hmm", ""));
    provider.add_text_response(r#"{"action": "wait"}"#);
    // The summary request finds the script exhausted and fails.
    let executor = ScriptedExecutor::default();

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_executor(executor.clone())
        .with_max_iterations(4)
        .build();

    let answer = agent.solve("flaky network").await;
    assert_eq!(answer, fallback_message(4));
    assert!(answer.contains("4 diagnostic steps"));
    assert_eq!(provider.request_count(), 5);
    assert_eq!(executor.commands(), ["uptime"]);
}

#[tokio::test]
async fn test_settings_clamped() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&execute("look", "ls"));
    provider.add_text_response("Nothing found.");

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_max_iterations(0)
        .with_llm_timeout(Duration::ZERO)
        .build();
    assert_eq!(agent.settings().max_iterations, 1);
    assert_eq!(agent.settings().llm_timeout, Duration::from_secs(30));

    let answer = agent.solve("q").await;
    assert_eq!(answer, format!("{SUMMARY_LEAD_IN}Nothing found."));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_concurrent_tasks() {
    let mut provider = TestModelProvider::default();
    provider.add_text_response(&final_answer("same"));
    provider.add_text_response(&final_answer("same"));

    let agent = AgentBuilder::with_model_provider(provider.clone()).build();
    let (a, b) = tokio::join!(agent.solve("first"), agent.solve("second"));
    assert_eq!(a, "same");
    assert_eq!(b, "same");

    // Each task renders its own, empty history.
    for idx in 0..2 {
        assert!(prompt_of(&provider, idx).contains("This is your first step."));
    }
}
