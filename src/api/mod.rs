//! HTTP API.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/agents` - Available agents and their tools
//! - `POST /api/agents/react` - Run the general ReAct agent
//! - `POST /api/agents/weather` - Run the weather agent
//! - `POST /api/functions/call` - Dispatch a query to a single tool

mod agents;
mod functions;
mod routes;
pub mod types;

pub use routes::{routes, serve, AppState};
