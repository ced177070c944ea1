use thiserror::Error;

use super::parser::ParseError;
use crate::llm::LlmError;

/// Everything that can go wrong inside a run.
///
/// Only `ExternalService`, an exhausted parse budget and
/// `IterationLimitExceeded` end a run; the rest are turned into observations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("could not parse model output: {0}")]
    Parse(#[from] ParseError),

    #[error("unknown tool: {name}. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("invalid arguments for '{tool}': {message}")]
    ArgumentValidation { tool: String, message: String },

    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("completion service error: {0}")]
    ExternalService(#[from] LlmError),

    #[error("reached the iteration limit ({0}) without a final answer")]
    IterationLimitExceeded(usize),
}
