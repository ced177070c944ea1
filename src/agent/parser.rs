//! Parser for ReAct-formatted model output.
//!
//! Accepted shapes:
//!
//! ```text
//! Thought: <free text>
//! Action: <tool name>
//! Action Input: <JSON object or free text>
//! ```
//!
//! or
//!
//! ```text
//! Thought: <free text>
//! Final Answer: <answer>
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

const FINAL_ANSWER: &str = "Final Answer:";

/// Marker the completion request stops on; anything after it is the model
/// imagining a tool result.
pub const OBSERVATION_STOP: &str = "\nObservation:";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing 'Action:' or 'Final Answer:'")]
    MissingMarker,

    #[error("'Action:' is not followed by 'Action Input:'")]
    MissingActionInput,

    #[error("'Action:' names no tool")]
    EmptyAction,

    #[error("output contains both an action and a final answer")]
    ActionAndFinalAnswer,

    #[error("'Final Answer:' is empty")]
    EmptyAnswer,
}

/// Argument payload following `Action Input:`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionInput {
    Arguments(Map<String, Value>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    FinalAnswer {
        thought: Option<String>,
        answer: String,
    },
    Action {
        thought: Option<String>,
        tool: String,
        input: ActionInput,
    },
}

// Both markers must open a line and the tool name is read from a single line.
fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ms)^[ \t]*Action[ \t]*\d*[ \t]*:([^\n]*)\n\s*Action[ \t]*\d*[ \t]*Input[ \t]*\d*[ \t]*:(.*)",
        )
        .expect("valid action regex")
    })
}

fn action_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*Action[ \t]*\d*[ \t]*:").expect("valid action marker regex")
    })
}

fn final_answer_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*Final Answer:").expect("valid final answer regex")
    })
}

/// Parse one model reply into a decision.
pub fn parse(raw: &str) -> Result<Decision, ParseError> {
    let text = strip_imagined_observation(raw);

    if let Some(caps) = action_re().captures(text) {
        // Only a line-leading marker counts; the phrase may appear inside arguments.
        if final_answer_line_re().is_match(text) {
            return Err(ParseError::ActionAndFinalAnswer);
        }
        let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let tool = clean_tool_name(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
        if tool.is_empty() {
            return Err(ParseError::EmptyAction);
        }
        let input = parse_input(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
        return Ok(Decision::Action {
            thought: thought_before(text, whole),
            tool,
            input,
        });
    }

    if let Some(at) = text.find(FINAL_ANSWER) {
        let answer = text[at + FINAL_ANSWER.len()..].trim();
        if answer.is_empty() {
            return Err(ParseError::EmptyAnswer);
        }
        return Ok(Decision::FinalAnswer {
            thought: thought_before(text, at),
            answer: answer.to_string(),
        });
    }

    if action_marker_re().is_match(text) {
        return Err(ParseError::MissingActionInput);
    }
    Err(ParseError::MissingMarker)
}

fn strip_imagined_observation(raw: &str) -> &str {
    match raw.find(OBSERVATION_STOP) {
        Some(at) => &raw[..at],
        None => raw,
    }
}

fn thought_before(text: &str, end: usize) -> Option<String> {
    let thought = text[..end].trim();
    let thought = thought.strip_prefix("Thought:").unwrap_or(thought).trim();
    (!thought.is_empty()).then(|| thought.to_string())
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'' || c == '*')
        .trim()
        .to_string()
}

fn parse_input(raw: &str) -> ActionInput {
    let mut input = raw.trim();

    // ```json ... ``` fences
    if let Some(rest) = input.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        input = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => ActionInput::Arguments(map),
        Ok(Value::String(s)) => ActionInput::Text(s),
        _ => ActionInput::Text(
            input
                .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                .trim()
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_action_with_json_input() {
        let out = parse(
            "Thought: I should add the numbers\nAction: calculator\nAction Input: {\"expression\": \"2+3\"}",
        )
        .unwrap();
        let mut args = Map::new();
        args.insert("expression".into(), json!("2+3"));
        assert_eq!(
            out,
            Decision::Action {
                thought: Some("I should add the numbers".into()),
                tool: "calculator".into(),
                input: ActionInput::Arguments(args),
            }
        );
    }

    #[test]
    fn plain_text_input_is_kept_as_text() {
        match parse("Action: `calculator`\nAction Input: \"(2+3)*4\"").unwrap() {
            Decision::Action { tool, input, thought } => {
                assert_eq!(tool, "calculator");
                assert_eq!(input, ActionInput::Text("(2+3)*4".into()));
                assert_eq!(thought, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fenced_json_input() {
        let out = parse("Action: get_weather_forecast\nAction Input: ```json\n{\"city\": \"Beijing\", \"days\": 2}\n```")
            .unwrap();
        match out {
            Decision::Action { input: ActionInput::Arguments(args), .. } => {
                assert_eq!(args["days"], json!(2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_final_answer() {
        let out = parse("Thought: I now know the final answer\nFinal Answer: The result is 5.").unwrap();
        assert_eq!(
            out,
            Decision::FinalAnswer {
                thought: Some("I now know the final answer".into()),
                answer: "The result is 5.".into(),
            }
        );
    }

    #[test]
    fn drops_imagined_observation() {
        let out = parse(
            "Action: calculator\nAction Input: 2+3\nObservation: 5\nThought: done\nFinal Answer: 5",
        )
        .unwrap();
        assert!(matches!(out, Decision::Action { .. }));
    }

    #[test]
    fn reports_grammar_errors() {
        assert_eq!(parse("I think it's 5"), Err(ParseError::MissingMarker));
        assert_eq!(parse("Action: calculator"), Err(ParseError::MissingActionInput));
        assert_eq!(parse("Action: \nAction Input: {}"), Err(ParseError::EmptyAction));
        assert_eq!(parse("Final Answer:   "), Err(ParseError::EmptyAnswer));
        assert_eq!(
            parse("Action: calculator\nAction Input: 1+1\nFinal Answer: 2"),
            Err(ParseError::ActionAndFinalAnswer)
        );
        assert_eq!(
            parse("Final Answer: 2\nAction: calculator\nAction Input: 1+1"),
            Err(ParseError::ActionAndFinalAnswer)
        );
    }

    #[test]
    fn action_word_inside_thought_is_not_a_marker() {
        let out = parse("Thought: I'll decide on an Action: later\nAction: calculator\nAction Input: 2+3")
            .unwrap();
        assert_eq!(
            out,
            Decision::Action {
                thought: Some("I'll decide on an Action: later".into()),
                tool: "calculator".into(),
                input: ActionInput::Text("2+3".into()),
            }
        );
    }

    #[test]
    fn final_answer_phrase_inside_arguments_is_still_an_action() {
        match parse("Thought: write it\nAction: echo\nAction Input: {\"text\": \"Final Answer: is 5\"}")
            .unwrap()
        {
            Decision::Action { tool, input: ActionInput::Arguments(args), .. } => {
                assert_eq!(tool, "echo");
                assert_eq!(args["text"], json!("Final Answer: is 5"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
