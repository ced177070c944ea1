//! Router construction, shared state and the server entry point.

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::types::HealthResponse;
use super::{agents, functions};
use crate::agent::{AgentKind, ReactAgent, SimpleAgent, ToolExecutor};
use crate::config::Config;
use crate::dispatch::FunctionDispatcher;
use crate::llm::{LlmClient, OpenAiCompatClient};
use crate::tools::ToolRegistry;

/// State shared by every request. Immutable after startup.
pub struct AppState {
    pub config: Config,
    pub react: ReactAgent,
    pub weather: ReactAgent,
    pub simple: SimpleAgent,
    pub dispatcher: FunctionDispatcher,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        let react = AgentKind::React.build(&config, Arc::clone(&llm));
        let weather = AgentKind::Weather.build(&config, Arc::clone(&llm));
        let simple =
            SimpleAgent::from_config(&config, Arc::clone(&llm), Arc::new(ToolRegistry::all()));
        let executor =
            ToolExecutor::new(Arc::new(ToolRegistry::all())).with_timeout(config.tool_timeout);
        let dispatcher = FunctionDispatcher::new(llm, config.llm.model.clone(), executor);

        Self {
            config,
            react,
            weather,
            simple,
            dispatcher,
        }
    }

    pub fn agent(&self, kind: AgentKind) -> &ReactAgent {
        match kind {
            AgentKind::React => &self.react,
            AgentKind::Weather => &self.weather,
        }
    }
}

pub fn routes(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/api/agents", get(agents::list_agents))
        .route("/api/agents/health", get(agents::agent_health))
        .route("/api/agents/simple", post(agents::run_simple))
        .route("/api/agents/react", post(agents::run_react))
        .route("/api/agents/weather", post(agents::run_weather))
        .route("/api/functions/call", post(functions::call_function))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiCompatClient::from_config(&config.llm));
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, llm));
    let app = routes(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
