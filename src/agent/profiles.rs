//! Preconfigured agents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::agent_loop::ReactAgent;
use super::types::RunConfig;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::tools::{supported_cities, ToolRegistry};

const WEATHER_INSTRUCTIONS: &str = "\
You are a weather assistant that helps users get weather information and practical advice.
1. Prefer get_current_weather for current conditions.
2. Use get_weather_forecast when the user asks about coming days.
3. After fetching weather data you may call get_weather_suggestion for clothing and activity advice.
4. Give friendly, detailed answers that include the concrete weather data.
5. If the user did not name a city, ask which city they mean.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// General agent with the calculator and date/time tools.
    React,
    /// Weather specialist.
    Weather,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::React, AgentKind::Weather];

    pub fn name(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Weather => "weather",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::React => "Reasons step by step and calls calculator and date/time tools",
            Self::Weather => "Answers weather questions for supported cities",
        }
    }

    pub fn registry(self) -> ToolRegistry {
        match self {
            Self::React => ToolRegistry::general(),
            Self::Weather => ToolRegistry::weather(),
        }
    }

    pub fn instructions(self) -> Option<String> {
        match self {
            Self::React => None,
            Self::Weather => Some(format!(
                "{}\nSupported cities: {}.",
                WEATHER_INSTRUCTIONS,
                supported_cities().join(", ")
            )),
        }
    }

    /// Run limits used when the caller doesn't give any.
    pub fn default_run_config(self, config: &Config) -> RunConfig {
        match self {
            Self::React => RunConfig::new(config.max_iterations).verbose(config.verbose),
            Self::Weather => RunConfig::new(3).verbose(true),
        }
    }

    pub fn build(self, config: &Config, llm: Arc<dyn LlmClient>) -> ReactAgent {
        let agent = ReactAgent::from_config(config, llm, Arc::new(self.registry())).with_name(self.name());
        match self.instructions() {
            Some(instructions) => agent.with_instructions(instructions),
            None => agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;

    #[test]
    fn weather_profile() {
        let config = Config::new("k", "http://localhost", "m");
        let agent = AgentKind::Weather.build(&config, Arc::new(ScriptedClient::replies(Vec::<String>::new())));
        assert_eq!(agent.name(), "weather");
        assert!(agent.registry().resolve("get_current_weather").is_ok());
        assert!(agent.registry().resolve("calculator").is_err());
        assert_eq!(AgentKind::Weather.default_run_config(&config).max_iterations, 3);
        assert!(AgentKind::Weather.instructions().unwrap().contains("ask which city"));
    }

    #[test]
    fn react_profile_follows_config() {
        let mut config = Config::new("k", "http://localhost", "m");
        config.max_iterations = 7;
        assert_eq!(AgentKind::React.default_run_config(&config).max_iterations, 7);
        assert!(AgentKind::React.instructions().is_none());
        assert_eq!(serde_json::to_value(AgentKind::React).unwrap(), "react");
    }
}
