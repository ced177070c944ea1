//! Single-round tool calling.
//!
//! The dispatcher picks and runs at most one tool, then the model phrases the
//! answer from the tool result. There is no loop and no transcript.

use std::sync::Arc;

use serde_json::Value;

use super::error::AgentError;
use super::executor::ToolExecutor;
use super::transcript::IntermediateStep;
use crate::config::Config;
use crate::dispatch::{FunctionDispatcher, Strategy};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::tools::ToolRegistry;

const SIMPLE_INSTRUCTIONS: &str = "\
You are a helpful assistant that can use tools to solve the user's problem.
When a tool result is provided, base your answer on it and state it clearly.";

const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Outcome of a simple run.
#[derive(Debug, Clone)]
pub struct SimpleRunResult {
    pub final_answer: Option<String>,
    pub tool_calls: Vec<IntermediateStep>,
    pub error: Option<String>,
}

impl SimpleRunResult {
    pub fn is_answered(&self) -> bool {
        self.final_answer.is_some()
    }
}

pub struct SimpleAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    dispatcher: FunctionDispatcher,
}

impl SimpleAgent {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, registry: Arc<ToolRegistry>) -> Self {
        Self::with_executor(llm, model.into(), ToolExecutor::new(registry))
    }

    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        let executor = ToolExecutor::new(registry).with_timeout(config.tool_timeout);
        let mut agent = Self::with_executor(llm, config.llm.model.clone(), executor);
        agent.max_tokens = config.llm.max_tokens;
        agent
    }

    fn with_executor(llm: Arc<dyn LlmClient>, model: String, executor: ToolExecutor) -> Self {
        let dispatcher = FunctionDispatcher::new(Arc::clone(&llm), model.clone(), executor);
        Self {
            llm,
            model,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: None,
            dispatcher,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    /// Answer `query` with at most one tool call. Always returns a result.
    pub async fn run(&self, query: &str) -> SimpleRunResult {
        let outcome = self.dispatcher.dispatch(query, Strategy::Auto).await;

        let mut messages = vec![
            ChatMessage::system(SIMPLE_INSTRUCTIONS),
            ChatMessage::user(query),
        ];
        let mut tool_calls = Vec::new();
        if let (Some(tool), Some(result)) = (outcome.tool, outcome.result) {
            messages.push(ChatMessage::assistant(format!(
                "Calling {} with {}",
                tool,
                Value::Object(outcome.arguments.clone())
            )));
            messages.push(ChatMessage::user(format!(
                "Tool result: {}\n\nAnswer my original question using this result.",
                result
            )));
            tool_calls.push(IntermediateStep {
                tool,
                tool_input: outcome.arguments,
                observation: result,
                is_error: outcome.is_error,
            });
        }

        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        };

        match self.llm.complete(&request).await {
            Ok(reply) => {
                tracing::info!(tool_calls = tool_calls.len(), "Simple run answered");
                SimpleRunResult {
                    final_answer: Some(reply.trim().to_string()),
                    tool_calls,
                    error: None,
                }
            }
            Err(e) => {
                let err = AgentError::ExternalService(e);
                tracing::error!(error = %err, "Simple run failed");
                SimpleRunResult {
                    final_answer: None,
                    tool_calls,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
