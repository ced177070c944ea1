//! # ReAct Agent Demo
//!
//! A small reasoning-and-acting agent service.
//!
//! This library provides:
//! - A ReAct loop alternating model reasoning with tool execution
//! - A registry of schema-described tools (calculator, date/time, mock weather)
//! - A single-shot function dispatcher (LLM or keyword selection)
//! - An HTTP API exposing the agents and the dispatcher
//!
//! ## Architecture
//!
//! A run follows the "tools in a loop" pattern:
//! 1. Seed a transcript with the user's question
//! 2. Ask the model for the next step in the ReAct text format
//! 3. Run the requested tool and append its observation
//! 4. Repeat until a final answer or the iteration cap
//!
//! ## Example
//!
//! ```rust,ignore
//! use react_agent_demo::{agent::{AgentKind, RunConfig}, config::Config, llm::OpenAiCompatClient};
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiCompatClient::from_config(&config.llm));
//! let agent = AgentKind::React.build(&config, llm);
//! let result = agent.run("What is 2 + 3 * 4?", &RunConfig::default()).await;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod llm;
pub mod tools;

pub use config::Config;
