//! Best-effort answer when the step budget runs out.

use std::time::Duration;

use crate::deadline::call_with_deadline;
use crate::history::History;
use crate::model_client::ModelClient;
use crate::prompt;

/// Prefix of a summary produced by the model.
pub const SUMMARY_LEAD_IN: &str =
    "I've completed my diagnostic steps. Here's what I found:\n\n";

/// Returns the templated answer used when no summary can be produced.
pub fn fallback_message(steps: usize) -> String {
    format!(
        "I've completed {steps} diagnostic steps but need more time to fully \
        resolve this. Based on what I've found so far, you may want to run \
        additional diagnostics manually."
    )
}

/// Asks the model to summarize `history`.
///
/// This never fails. Any model failure, including `limit` elapsing,
/// degrades to [`fallback_message`].
pub(crate) async fn summarize(
    client: &ModelClient,
    query: &str,
    history: &History,
    limit: Duration,
) -> String {
    let prompt = prompt::summary_prompt(query, &history.render());
    let result = call_with_deadline(limit, client.invoke(&prompt)).await;

    match result {
        Ok(Ok(summary)) if !summary.trim().is_empty() => {
            format!("{SUMMARY_LEAD_IN}{summary}")
        }
        Ok(Ok(_)) => {
            warn!("model returned an empty summary");
            fallback_message(history.len())
        }
        Ok(Err(err)) => {
            warn!("failed to summarize: {err}");
            fallback_message(history.len())
        }
        Err(err) => {
            warn!("failed to summarize: {err}");
            fallback_message(history.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use rabbit_test_model::{PresetResponse, TestModelProvider};

    use super::*;
    use crate::decision::{Action, Decision};
    use crate::history::HistoryEntry;

    fn history_of(steps: usize) -> History {
        let mut history = History::default();
        for i in 1..=steps {
            history.push(HistoryEntry::new(
                i,
                &Decision {
                    thought: "look around".to_owned(),
                    action: Action::ExecuteCommand("ls".to_owned()),
                },
            ));
        }
        history
    }

    #[test]
    fn test_fallback_message() {
        assert!(
            fallback_message(4)
                .starts_with("I've completed 4 diagnostic steps but need")
        );
        assert!(fallback_message(4).ends_with("diagnostics manually."));
    }

    #[tokio::test]
    async fn test_summary() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("The disk is almost full.");
        let client = ModelClient::new(provider.clone());

        let history = history_of(2);
        let answer =
            summarize(&client, "disk", &history, Duration::from_secs(30))
                .await;
        assert_eq!(
            answer,
            format!("{SUMMARY_LEAD_IN}The disk is almost full.")
        );

        let prompt = provider.requests()[0].last_user_text().unwrap().to_owned();
        assert!(prompt.contains("Query: disk\n"));
        assert!(prompt.contains("--- Iteration 2 ---"));
    }

    #[tokio::test]
    async fn test_failure_degrades() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_error("overloaded"));
        provider.add_text_response("   ");
        let client = ModelClient::new(provider);

        let history = history_of(3);
        for _ in 0..2 {
            let answer =
                summarize(&client, "q", &history, Duration::from_secs(30)).await;
            assert_eq!(answer, fallback_message(3));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades() {
        let mut provider = TestModelProvider::default();
        provider.add_response(
            PresetResponse::with_text("too late")
                .delayed(Duration::from_secs(120)),
        );
        let client = ModelClient::new(provider);

        let answer =
            summarize(&client, "q", &history_of(1), Duration::from_secs(30))
                .await;
        assert_eq!(answer, fallback_message(1));
    }
}
