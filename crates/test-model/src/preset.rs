use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
}

/// The preset response for one model request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails with this message instead of streaming.
    #[serde(default)]
    pub error: Option<String>,
    /// Overrides the provider delay between events.
    #[serde(default)]
    pub delay: Option<Duration>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            ..Default::default()
        }
    }

    /// Creates a `PresetResponse` that streams `text` word by word.
    pub fn with_text(text: &str) -> Self {
        let events: Vec<_> = text
            .split_inclusive(' ')
            .map(|word| PresetEvent::MessageDelta(word.to_owned()))
            .collect();
        Self::with_events(events)
    }

    /// Creates a `PresetResponse` that fails the request.
    #[inline]
    pub fn with_error<S: Into<String>>(message: S) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Sets the delay before each event of this response.
    #[inline]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the full text this response streams.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .map(|PresetEvent::MessageDelta(delta)| delta.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_text_keeps_whitespace() {
        let response = PresetResponse::with_text("check disk usage");
        assert_eq!(response.events.len(), 3);
        assert_eq!(response.text(), "check disk usage");
    }

    #[test]
    fn test_deserialize_script() {
        let script = r#"[
            {"events": [{"type": "message_delta", "data": "{\"action\": "},
                        {"type": "message_delta", "data": "\"final_answer\"}"}]},
            {"events": [], "error": "boom"}
        ]"#;
        let responses: Vec<PresetResponse> =
            serde_json::from_str(script).unwrap();
        assert_eq!(responses[0].text(), r#"{"action": "final_answer"}"#);
        assert_eq!(responses[1].error.as_deref(), Some("boom"));
        assert_eq!(responses[1].delay, None);
    }
}
