//! API request and response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{IntermediateStep, RunResult, SimpleRunResult, TerminationReason, Transcript};
use crate::dispatch::Strategy;
use crate::tools::ToolSpec;

/// Request to run an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRunRequest {
    /// The user's question
    pub query: String,

    /// Optional iteration cap (uses the agent's default if not specified)
    pub max_iterations: Option<usize>,

    /// Optional per-run verbosity override
    pub verbose: Option<bool>,
}

/// Result of an agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRunResponse {
    /// True when the run produced a final answer
    pub success: bool,

    /// Unique run identifier
    pub run_id: Uuid,

    /// Final answer, or the best effort answer when the cap was hit
    pub result: Option<String>,

    /// Number of tool rounds used
    pub iterations: usize,

    pub terminated_reason: TerminationReason,

    /// Tool calls with their observations
    pub intermediate_steps: Vec<IntermediateStep>,

    /// Full run history
    pub transcript: Transcript,

    pub error: Option<String>,
}

impl From<RunResult> for AgentRunResponse {
    fn from(run: RunResult) -> Self {
        Self {
            success: run.is_answered(),
            run_id: run.run_id,
            intermediate_steps: run.intermediate_steps(),
            result: run.final_answer,
            iterations: run.iterations_used,
            terminated_reason: run.terminated_reason,
            transcript: run.transcript,
            error: run.error,
        }
    }
}

/// Request to the single-round agent.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleAgentRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleAgentResponse {
    pub success: bool,
    pub result: Option<String>,

    /// The tool call made for the query, if any
    pub tool_calls: Vec<IntermediateStep>,

    pub error: Option<String>,
}

impl From<SimpleRunResult> for SimpleAgentResponse {
    fn from(run: SimpleRunResult) -> Self {
        Self {
            success: run.is_answered(),
            result: run.final_answer,
            tool_calls: run.tool_calls,
            error: run.error,
        }
    }
}

/// Request to dispatch a query to a single tool.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCallRequest {
    pub query: String,

    /// Selection strategy (defaults to `auto`)
    #[serde(default)]
    pub strategy: Strategy,
}

/// Description of one available agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub default_max_iterations: usize,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<AgentInfo>,
}

/// Agent service status.
#[derive(Debug, Clone, Serialize)]
pub struct AgentHealthResponse {
    pub status: String,
    pub available_tools: usize,
    pub available_agents: Vec<String>,

    /// Agent name to run endpoint
    pub endpoints: BTreeMap<String, String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
