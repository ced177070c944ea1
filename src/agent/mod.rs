//! Agent module - the ReAct reasoning loop.
//!
//! A run alternates two steps over a transcript:
//! 1. Reasoning: the model reads the transcript and proposes a tool call or a final answer
//! 2. Execution: the proposed tool runs and its observation is appended
//!
//! The loop stops on a final answer, the iteration cap, an unrecoverable
//! completion failure or cancellation.

mod agent_loop;
mod error;
mod executor;
mod parser;
mod profiles;
mod prompt;
mod reasoning;
mod simple;
mod transcript;
mod types;

pub use agent_loop::ReactAgent;
pub use error::AgentError;
pub use executor::ToolExecutor;
pub use parser::{parse, ActionInput, Decision, ParseError, OBSERVATION_STOP};
pub use profiles::AgentKind;
pub use prompt::{build_scratchpad, build_system_prompt};
pub use reasoning::{Proposal, ReasoningError, ReasoningStep};
pub use simple::{SimpleAgent, SimpleRunResult};
pub use transcript::{IntermediateStep, Observation, ToolCall, Transcript, Turn};
pub use types::{RunConfig, RunResult, TerminationReason};
