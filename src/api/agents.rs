//! Agent run endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::routes::AppState;
use super::types::{
    AgentHealthResponse, AgentInfo, AgentListResponse, AgentRunRequest, AgentRunResponse,
    SimpleAgentRequest, SimpleAgentResponse,
};
use crate::agent::{AgentKind, RunConfig};

const SIMPLE_AGENT: &str = "simple";

/// List the available agents and their tools.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<AgentListResponse> {
    let mut agents: Vec<AgentInfo> = AgentKind::ALL
        .iter()
        .map(|&kind| AgentInfo {
            name: kind.name().to_string(),
            description: kind.description().to_string(),
            default_max_iterations: kind.default_run_config(&state.config).max_iterations,
            tools: state
                .agent(kind)
                .registry()
                .list_specs()
                .into_iter()
                .cloned()
                .collect(),
        })
        .collect();
    agents.push(AgentInfo {
        name: SIMPLE_AGENT.to_string(),
        description: "Calls at most one tool, then answers from its result".to_string(),
        default_max_iterations: 1,
        tools: state.simple.registry().list_specs().into_iter().cloned().collect(),
    });
    Json(AgentListResponse { agents })
}

/// Report that every agent is constructed and which endpoints serve them.
pub async fn agent_health(State(state): State<Arc<AppState>>) -> Json<AgentHealthResponse> {
    let mut names: Vec<&str> = vec![SIMPLE_AGENT];
    names.extend(AgentKind::ALL.iter().map(|k| k.name()));

    Json(AgentHealthResponse {
        status: "healthy".to_string(),
        available_tools: state.simple.registry().len(),
        available_agents: names.iter().map(|n| n.to_string()).collect(),
        endpoints: names
            .iter()
            .map(|n| (n.to_string(), format!("/api/agents/{}", n)))
            .collect(),
    })
}

pub async fn run_simple(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimpleAgentRequest>,
) -> Result<Json<SimpleAgentResponse>, (StatusCode, String)> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    tracing::info!(agent = SIMPLE_AGENT, "Agent run requested");
    let result = state.simple.run(query).await;
    Ok(Json(SimpleAgentResponse::from(result)))
}

pub async fn run_react(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentRunRequest>,
) -> Result<Json<AgentRunResponse>, (StatusCode, String)> {
    run_agent(&state, AgentKind::React, req).await
}

pub async fn run_weather(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentRunRequest>,
) -> Result<Json<AgentRunResponse>, (StatusCode, String)> {
    run_agent(&state, AgentKind::Weather, req).await
}

async fn run_agent(
    state: &AppState,
    kind: AgentKind,
    req: AgentRunRequest,
) -> Result<Json<AgentRunResponse>, (StatusCode, String)> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    match req.max_iterations {
        Some(0) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "max_iterations must be at least 1".to_string(),
            ))
        }
        Some(n) if n > state.config.max_iterations_limit => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!(
                    "max_iterations must not exceed {}",
                    state.config.max_iterations_limit
                ),
            ))
        }
        _ => {}
    }

    let defaults = kind.default_run_config(&state.config);
    let run_config = RunConfig {
        max_iterations: req.max_iterations.unwrap_or(defaults.max_iterations),
        verbose: req.verbose.unwrap_or(defaults.verbose),
    };

    tracing::info!(agent = kind.name(), max_iterations = run_config.max_iterations, "Agent run requested");
    let result = state.agent(kind).run(query, &run_config).await;
    Ok(Json(AgentRunResponse::from(result)))
}
