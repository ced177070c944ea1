//! Run transcript: the ordered, append-only history of a single run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// Result (or error) of a tool invocation, fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Tool that produced this observation; `None` for parse-failure notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub content: String,
    pub is_error: bool,
}

impl Observation {
    pub fn success(tool: &str, content: impl Into<String>) -> Self {
        Self {
            tool: Some(tool.to_string()),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            tool: tool.map(str::to_string),
            content: content.into(),
            is_error: true,
        }
    }
}

/// One turn of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    UserQuery { content: String },
    AgentThought { content: String },
    ToolCall(ToolCall),
    Observation(Observation),
    FinalAnswer { content: String },
}

/// A tool round as reported to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct IntermediateStep {
    pub tool: String,
    pub tool_input: Map<String, Value>,
    pub observation: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_query(&mut self, content: &str) {
        self.turns.push(Turn::UserQuery {
            content: content.to_string(),
        });
    }

    pub fn push_thought(&mut self, content: &str) {
        self.turns.push(Turn::AgentThought {
            content: content.to_string(),
        });
    }

    /// Append a tool call together with its observation, so a call is never
    /// left without a result.
    pub fn push_action(&mut self, call: ToolCall, observation: Observation) {
        self.turns.push(Turn::ToolCall(call));
        self.turns.push(Turn::Observation(observation));
    }

    /// Append an observation that does not answer a tool call (e.g. a note
    /// that the model's output could not be parsed).
    pub fn push_note(&mut self, observation: Observation) {
        self.turns.push(Turn::Observation(observation));
    }

    pub fn push_final_answer(&mut self, content: &str) {
        self.turns.push(Turn::FinalAnswer {
            content: content.to_string(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_thought(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|t| match t {
            Turn::AgentThought { content } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.turns.iter().filter_map(|t| match t {
            Turn::Observation(o) => Some(o),
            _ => None,
        })
    }

    /// Tool calls paired with their observations.
    pub fn intermediate_steps(&self) -> Vec<IntermediateStep> {
        self.turns
            .windows(2)
            .filter_map(|pair| match pair {
                [Turn::ToolCall(call), Turn::Observation(obs)] => Some(IntermediateStep {
                    tool: call.tool.clone(),
                    tool_input: call.arguments.clone(),
                    observation: obs.content.clone(),
                    is_error: obs.is_error,
                }),
                _ => None,
            })
            .collect()
    }

    /// Every tool call is immediately followed by exactly one tool
    /// observation. Parse-failure notes carry no tool and don't count.
    pub fn is_well_formed(&self) -> bool {
        self.turns.iter().enumerate().all(|(i, turn)| match turn {
            Turn::ToolCall(call) => {
                matches!(
                    self.turns.get(i + 1),
                    Some(Turn::Observation(o)) if o.tool.as_deref() == Some(call.tool.as_str())
                ) && !matches!(
                    self.turns.get(i + 2),
                    Some(Turn::Observation(o)) if o.tool.is_some()
                )
            }
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_keep_calls_paired() {
        let mut t = Transcript::new();
        t.push_query("2+3?");
        t.push_thought("use the calculator");
        let mut args = Map::new();
        args.insert("expression".into(), json!("2+3"));
        t.push_action(
            ToolCall::new("calculator", args),
            Observation::success("calculator", "5"),
        );
        t.push_final_answer("5");

        assert!(t.is_well_formed());
        assert!(matches!(&t.turns()[0], Turn::UserQuery { content } if content == "2+3?"));
        assert_eq!(t.last_thought(), Some("use the calculator"));
        let steps = t.intermediate_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].observation, "5");
    }

    #[test]
    fn dangling_call_is_not_well_formed() {
        let t = Transcript {
            turns: vec![Turn::ToolCall(ToolCall::new("x", Map::new()))],
        };
        assert!(!t.is_well_formed());
    }

    #[test]
    fn turns_serialize_with_type_tag() {
        let mut t = Transcript::new();
        t.push_query("hi");
        t.push_note(Observation::error(None, "bad format"));
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v[0], json!({"type": "user_query", "content": "hi"}));
        assert_eq!(
            v[1],
            json!({"type": "observation", "content": "bad format", "is_error": true})
        );
    }
}
