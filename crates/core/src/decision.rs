//! Turning raw model text into a validated [`Decision`].

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde_json::{Map, Value};

/// The thought used when the model didn't explain itself.
pub const DEFAULT_THOUGHT: &str = "Processing...";

/// The answer used when a `final_answer` decision carries a `null` answer.
pub const DEFAULT_ANSWER: &str =
    "I don't have enough information to answer that.";

/// Maximum characters of the raw text kept for diagnostics.
const EXCERPT_CHARS: usize = 200;

/// The action selected by one reasoning step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Run a command and observe its outcome. The command may be empty,
    /// which the agent treats as a non-fatal no-op.
    ExecuteCommand(String),
    /// Stop and answer the user.
    FinalAnswer(String),
    /// Any other action name. Well-formed, but the agent can't act on it.
    Unknown(String),
}

impl Action {
    /// Returns the wire name of this action.
    pub fn name(&self) -> &str {
        match self {
            Action::ExecuteCommand(_) => "execute_command",
            Action::FinalAnswer(_) => "final_answer",
            Action::Unknown(name) => name,
        }
    }
}

/// The structured result of one reasoning step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Decision {
    /// The model's reasoning for this step.
    pub thought: String,
    /// What the model wants to do next.
    pub action: Action,
}

impl Decision {
    /// Parses a decision from raw model output.
    ///
    /// The payload is taken from the first ` ```json ` fenced block, then
    /// from the first fenced block of any kind, and finally from the whole
    /// trimmed text.
    pub fn parse(raw: &str) -> Result<Self, DecisionParseError> {
        let payload = extract_payload(raw);
        let value: Value = serde_json::from_str(payload).map_err(|err| {
            DecisionParseError::new(
                DecisionErrorKind::InvalidPayload,
                format!("{err}"),
                raw,
            )
        })?;
        let Value::Object(obj) = value else {
            return Err(DecisionParseError::new(
                DecisionErrorKind::InvalidPayload,
                "expected a JSON object",
                raw,
            ));
        };
        Self::from_object(&obj, raw)
    }

    fn from_object(
        obj: &Map<String, Value>,
        raw: &str,
    ) -> Result<Self, DecisionParseError> {
        let missing = |field: &str, reason: &str| {
            DecisionParseError::new(
                DecisionErrorKind::MissingField,
                format!("missing '{field}' field{reason}"),
                raw,
            )
        };

        let action = obj.get("action").ok_or_else(|| missing("action", ""))?;
        let action = text_of(action).unwrap_or_default();

        let action = match action.as_str() {
            "execute_command" => {
                let command = obj.get("command").ok_or_else(|| {
                    missing("command", " for execute_command action")
                })?;
                Action::ExecuteCommand(text_of(command).unwrap_or_default())
            }
            "final_answer" => {
                let answer = obj.get("answer").ok_or_else(|| {
                    missing("answer", " for final_answer action")
                })?;
                Action::FinalAnswer(
                    text_of(answer).unwrap_or_else(|| DEFAULT_ANSWER.to_owned()),
                )
            }
            _ => Action::Unknown(action),
        };

        let thought = obj
            .get("thought")
            .and_then(text_of)
            .unwrap_or_else(|| DEFAULT_THOUGHT.to_owned());

        Ok(Self { thought, action })
    }
}

impl FromStr for Decision {
    type Err = DecisionParseError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The kind of decision parsing failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecisionErrorKind {
    /// The payload is not a well-formed JSON object.
    InvalidPayload,
    /// The payload lacks a field its action requires.
    MissingField,
}

/// Describes why a model output could not be turned into a decision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecisionParseError {
    kind: DecisionErrorKind,
    reason: String,
    excerpt: String,
}

impl DecisionParseError {
    fn new<S: Into<String>>(kind: DecisionErrorKind, reason: S, raw: &str) -> Self {
        Self {
            kind,
            reason: reason.into(),
            excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> DecisionErrorKind {
        self.kind
    }

    /// Returns the first characters of the offending model output.
    #[inline]
    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }
}

impl Display for DecisionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DecisionErrorKind::InvalidPayload => {
                write!(f, "invalid JSON response: {}", self.reason)
            }
            DecisionErrorKind::MissingField => write!(f, "{}", self.reason),
        }
    }
}

impl StdError for DecisionParseError {}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn extract_payload(raw: &str) -> &str {
    json_block(raw)
        .or_else(|| first_block(raw))
        .unwrap_or(raw)
        .trim()
}

const FENCE: &str = "```";

/// Returns the length of the language tag at the start of `text`.
#[inline]
fn tag_len(text: &str) -> usize {
    text.find(|c: char| !(c.is_alphanumeric() || "-_+.".contains(c)))
        .unwrap_or(text.len())
}

/// Returns the text up to the next fence, or all of it if the block is
/// unterminated.
#[inline]
fn block_body(text: &str) -> &str {
    text.find(FENCE).map_or(text, |end| &text[..end])
}

/// Finds the body of the first block opened with a `json` tag.
///
/// Openers are looked up directly instead of pairing fences, so a stray
/// fence in the surrounding prose doesn't hide the block.
fn json_block(raw: &str) -> Option<&str> {
    let mut offset = 0;
    while let Some(idx) = raw[offset..].find(FENCE) {
        offset += idx + FENCE.len();
        let after = &raw[offset..];
        let (tag, body) = after.split_at(tag_len(after));
        if tag.eq_ignore_ascii_case("json") {
            return Some(block_body(body));
        }
    }
    None
}

/// Finds the body of the first fenced block, dropping its language tag.
fn first_block(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE)? + FENCE.len();
    let after = &raw[start..];
    Some(block_body(&after[tag_len(after)..]))
}
