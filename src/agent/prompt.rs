//! Prompt templates for the ReAct agent.

use super::transcript::{Transcript, Turn};
use crate::tools::ToolSpec;

/// Build the system prompt with tool definitions and the output format.
pub fn build_system_prompt(tools: &[&ToolSpec], instructions: Option<&str>) -> String {
    let tool_descriptions = tools
        .iter()
        .map(|t| describe_tool(t))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let instructions = instructions
        .map(|i| format!("\n## Instructions\n\n{}\n", i.trim()))
        .unwrap_or_default();

    format!(
        r#"Answer the user's question as best you can. You have access to the following tools:

{tool_descriptions}
{instructions}
## Response Format

Use exactly this format:

Thought: think about what to do next
Action: the tool to use, one of [{tool_names}]
Action Input: a JSON object with the tool's arguments, e.g. {{"expression": "2 + 3"}}

The system will run the tool and reply with:

Observation: the tool's result

Repeat Thought/Action/Action Input as needed. When you know the answer, reply with:

Thought: I now know the final answer
Final Answer: the final answer to the original question

Never write an Observation yourself. Never combine an Action and a Final Answer in one reply."#,
        tool_descriptions = tool_descriptions,
        instructions = instructions,
        tool_names = tool_names
    )
}

fn describe_tool(spec: &ToolSpec) -> String {
    let mut line = format!("- **{}**: {}", spec.name, spec.description);
    if spec.parameters.is_empty() {
        line.push_str("\n  Parameters: none (use {})");
    }
    for p in &spec.parameters {
        line.push_str(&format!(
            "\n  - `{}` ({}, {}): {}",
            p.name,
            p.param_type,
            if p.required { "required" } else { "optional" },
            p.description
        ));
    }
    line
}

/// Render the run so far as the ReAct scratchpad, ending with an open
/// `Thought:` for the model to continue.
pub fn build_scratchpad(transcript: &Transcript) -> String {
    let mut out = String::new();
    for turn in transcript.turns() {
        match turn {
            Turn::UserQuery { content } => {
                out.push_str(&format!("Question: {}\n", content));
            }
            Turn::AgentThought { content } => {
                out.push_str(&format!("Thought: {}\n", content));
            }
            Turn::ToolCall(call) => {
                let input = serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".to_string());
                out.push_str(&format!("Action: {}\nAction Input: {}\n", call.tool, input));
            }
            Turn::Observation(obs) => {
                out.push_str(&format!("Observation: {}\n", obs.content));
            }
            Turn::FinalAnswer { content } => {
                out.push_str(&format!("Final Answer: {}\n", content));
            }
        }
    }
    out.push_str("Thought:");
    out
}
