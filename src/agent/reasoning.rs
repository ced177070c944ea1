//! Reasoning step: ask the completion service for the next move.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::parser::{self, ActionInput, Decision, ParseError, OBSERVATION_STOP};
use super::prompt::{build_scratchpad, build_system_prompt};
use super::transcript::{ToolCall, Transcript};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};
use crate::tools::ToolSpec;

/// Next turn proposed by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    FinalAnswer {
        thought: Option<String>,
        answer: String,
    },
    ToolCall {
        thought: Option<String>,
        call: ToolCall,
    },
}

#[derive(Debug)]
pub enum ReasoningError {
    /// The reply did not follow the grammar. Recoverable.
    Parse { error: ParseError, raw: String },
    /// The completion service failed. Ends the run.
    Service(LlmError),
}

pub struct ReasoningStep {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    instructions: Option<String>,
}

impl ReasoningStep {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: None,
            instructions: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn build_request(&self, transcript: &Transcript, tools: &[&ToolSpec]) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(build_system_prompt(tools, self.instructions.as_deref())),
                ChatMessage::user(build_scratchpad(transcript)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![OBSERVATION_STOP.to_string()],
        }
    }

    /// Ask the model for the next turn. Never touches the transcript.
    pub async fn propose(
        &self,
        transcript: &Transcript,
        tools: &[&ToolSpec],
    ) -> Result<Proposal, ReasoningError> {
        let request = self.build_request(transcript, tools);
        let raw = self
            .llm
            .complete(&request)
            .await
            .map_err(ReasoningError::Service)?;

        tracing::trace!(provider = self.llm.provider(), reply = %raw, "Model reply");

        match parser::parse(&raw) {
            Ok(Decision::FinalAnswer { thought, answer }) => Ok(Proposal::FinalAnswer { thought, answer }),
            Ok(Decision::Action { thought, tool, input }) => {
                let arguments = bind_arguments(&tool, input, tools);
                Ok(Proposal::ToolCall {
                    thought,
                    call: ToolCall::new(tool, arguments),
                })
            }
            Err(error) => Err(ReasoningError::Parse { error, raw }),
        }
    }
}

/// Turn an action input into an argument map. Free text binds to the tool's
/// sole parameter when it has one, otherwise to `input`.
fn bind_arguments(tool: &str, input: ActionInput, tools: &[&ToolSpec]) -> Map<String, Value> {
    match input {
        ActionInput::Arguments(map) => map,
        ActionInput::Text(text) => {
            let spec = tools.iter().find(|s| s.name == tool);
            let mut map = Map::new();
            match spec {
                Some(spec) if spec.parameters.is_empty() => {}
                Some(spec) => {
                    let key = spec
                        .sole_parameter()
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| "input".to_string());
                    map.insert(key, Value::String(text));
                }
                None if text.is_empty() => {}
                None => {
                    map.insert("input".to_string(), Value::String(text));
                }
            }
            map
        }
    }
}
