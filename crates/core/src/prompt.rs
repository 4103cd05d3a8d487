//! Fixed prompt templates.

use crate::context::{OsInfo, ShellInfo};

/// Maximum number of available commands listed in the prompt.
pub const MAX_LISTED_COMMANDS: usize = 20;

/// Everything the reasoning prompt is rendered from.
#[derive(Clone, Copy, Debug)]
pub struct PromptContext<'a> {
    pub query: &'a str,
    pub os_info: &'a OsInfo,
    pub shell_info: &'a ShellInfo,
    pub commands: &'a [String],
}

/// Renders the reasoning prompt for the next step.
pub fn reasoning_prompt(ctx: &PromptContext<'_>, transcript: &str) -> String {
    let commands = ctx
        .commands
        .iter()
        .take(MAX_LISTED_COMMANDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let os_type = &ctx.os_info.os_type;

    format!(
        r#"
You are RabbitAI, a CLI troubleshooting assistant. Use the ReAct (Reasoning + Acting) pattern to solve the user's problem.

SYSTEM INFORMATION:
- OS: {os_type} {os_version}
- Shell: {shell_type}
- Available commands: {commands}

USER QUERY: {query}

PREVIOUS ACTIONS AND OBSERVATIONS:
{transcript}

INSTRUCTIONS:
Based on the user query and previous observations, decide your next action.

You can either:
1. Execute a command to gather more information
2. Provide a final answer if you have enough information

IMPORTANT:
- Use commands appropriate for {os_type}
- Start with simple diagnostic commands
- Build on previous observations
- Keep commands safe and read-only when possible
- Be concise and helpful

Respond in JSON format:
{{
    "thought": "your reasoning about what to do next and why",
    "action": "execute_command" or "final_answer",
    "command": "the command to run (only if action is execute_command)",
    "answer": "your final answer to the user (only if action is final_answer)"
}}

Make sure your response is valid JSON."#,
        os_version = ctx.os_info.release,
        shell_type = ctx.shell_info.shell_type,
        query = ctx.query,
    )
}

/// Renders the prompt asking for a summary of an unfinished task.
pub fn summary_prompt(query: &str, transcript: &str) -> String {
    format!(
        r#"
Based on these diagnostic steps, provide a brief summary of what was discovered about this query:

Query: {query}

Steps taken:
{transcript}

Provide a concise summary (2-3 sentences) of the findings."#
    )
}
