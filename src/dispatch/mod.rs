//! Single-shot function calling.
//!
//! A query is mapped straight to one tool call, either by asking the
//! completion service to pick a tool or by scoring keyword rules. The chosen
//! call goes through the same [`ToolExecutor`] the agent loop uses.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::agent::{Observation, ToolCall, ToolExecutor};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};
use crate::tools::ToolRegistry;

const CITY_PATTERN: &str =
    r"(?i)(beijing|shanghai|guangzhou|shenzhen|hangzhou|北京|上海|广州|深圳|杭州)";

/// How the dispatcher picks a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// LLM first, keywords if the LLM fails.
    #[default]
    Auto,
    Llm,
    Keyword,
}

/// Method that actually produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    Llm,
    Keyword,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("completion service error: {0}")]
    Service(#[from] LlmError),

    #[error("could not read tool selection: {0}")]
    InvalidReply(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// A matching rule for one tool.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub tool: String,
    pub keywords: Vec<String>,
    pub extractors: Vec<(String, Regex)>,
}

impl KeywordRule {
    pub fn new(tool: &str, keywords: &[&str]) -> Self {
        Self {
            tool: tool.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            extractors: Vec::new(),
        }
    }

    /// Fill `param` from the first capture group of `pattern` (or the whole
    /// match when the pattern has no group). Earlier extractors for the same
    /// parameter take precedence.
    pub fn with_extractor(mut self, param: &str, pattern: &str) -> Result<Self, regex::Error> {
        self.extractors.push((param.to_string(), Regex::new(pattern)?));
        Ok(self)
    }

    pub fn score(&self, query: &str) -> usize {
        let query = query.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| query.contains(k.as_str()))
            .count()
    }

    pub fn extract_arguments(&self, query: &str) -> Map<String, Value> {
        let mut args = Map::new();
        for (param, re) in &self.extractors {
            if args.contains_key(param) {
                continue;
            }
            if let Some(caps) = re.captures(query) {
                let value = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str().trim());
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    args.insert(param.clone(), Value::String(value.to_string()));
                }
            }
        }
        args
    }
}

/// Rules for the built-in tools.
pub fn default_rules() -> Vec<KeywordRule> {
    let rules = || -> Result<Vec<KeywordRule>, regex::Error> {
        Ok(vec![
            KeywordRule::new(
                "calculator",
                &["calculate", "compute", "plus", "minus", "times", "divided", "+", "*", "计算", "等于", "多少"],
            )
            .with_extractor("expression", r"([(\d](?:[\d\s.+\-*/%^()]*[\d)])?)")?,
            KeywordRule::new("current_time", &["time", "clock", "几点", "时间"]),
            KeywordRule::new("current_date", &["date", "today", "what day", "日期", "几号"]),
            KeywordRule::new("get_current_weather", &["weather", "temperature", "天气", "气温"])
                .with_extractor("city", CITY_PATTERN)?
                .with_extractor("city", r"\bin ([A-Z][a-zA-Z]+)")?,
            KeywordRule::new(
                "get_weather_forecast",
                &["forecast", "next", "days", "tomorrow", "week", "预报", "未来", "明天"],
            )
            .with_extractor("city", CITY_PATTERN)?
            .with_extractor("city", r"\b(?:in|for) ([A-Z][a-zA-Z]+)")?
            .with_extractor("days", r"(?i)(\d+)\s*(?:days?|天)")?,
        ])
    };
    match rules() {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!("Invalid built-in keyword rule: {}", e);
            Vec::new()
        }
    }
}

/// A tool picked for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// Result of dispatching one query.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub query: String,
    pub method: SelectionMethod,
    /// True when the LLM failed and keyword matching stood in.
    pub degraded: bool,
    pub tool: Option<String>,
    pub arguments: Map<String, Value>,
    pub result: Option<String>,
    pub is_error: bool,
    pub message: Option<String>,
}

pub struct FunctionDispatcher {
    llm: Arc<dyn LlmClient>,
    model: String,
    executor: ToolExecutor,
    rules: Vec<KeywordRule>,
}

impl FunctionDispatcher {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, executor: ToolExecutor) -> Self {
        Self {
            llm,
            model: model.into(),
            executor,
            rules: default_rules(),
        }
    }

    /// Replace the keyword rules. Rules naming unregistered tools are dropped.
    pub fn with_rules(mut self, rules: Vec<KeywordRule>) -> Self {
        let registry = Arc::clone(self.executor.registry());
        self.rules = rules
            .into_iter()
            .filter(|r| {
                let known = registry.spec(&r.tool).is_some();
                if !known {
                    tracing::warn!(tool = %r.tool, "Dropping keyword rule for unregistered tool");
                }
                known
            })
            .collect();
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Highest-scoring rule with at least one keyword hit. Ties go to the
    /// earlier rule.
    pub fn select_by_keywords(&self, query: &str) -> Option<&KeywordRule> {
        let mut best: Option<(&KeywordRule, usize)> = None;
        for rule in &self.rules {
            if self.registry().spec(&rule.tool).is_none() {
                continue;
            }
            let score = rule.score(query);
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((rule, score));
            }
        }
        best.map(|(rule, _)| rule)
    }

    pub fn extract_arguments(&self, rule: &KeywordRule, query: &str) -> Map<String, Value> {
        rule.extract_arguments(query)
    }

    /// Ask the completion service which tool fits `query`. `Ok(None)` means
    /// the model chose no tool.
    pub async fn select_with_llm(&self, query: &str) -> Result<Option<Selection>, DispatchError> {
        let tools: Vec<Value> = self
            .registry()
            .list_specs()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "description": s.description,
                    "parameters": s.parameters_schema(),
                })
            })
            .collect();
        let tools = serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string());

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(format!(
                    "Pick the single tool that best answers the user's request.\n\nTools:\n{}\n\n\
                     Reply with only a JSON object: {{\"tool\": \"<name>\", \"arguments\": {{...}}}}. \
                     Use {{\"tool\": null}} when no tool applies.",
                    tools
                )),
                ChatMessage::user(query),
            ],
            temperature: Some(0.0),
            ..Default::default()
        };

        let reply = self.llm.complete(&request).await?;
        self.parse_selection(&reply)
    }

    fn parse_selection(&self, reply: &str) -> Result<Option<Selection>, DispatchError> {
        let json = match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if start < end => &reply[start..=end],
            _ => return Err(DispatchError::InvalidReply("no JSON object in reply".to_string())),
        };
        let value: Value =
            serde_json::from_str(json).map_err(|e| DispatchError::InvalidReply(e.to_string()))?;

        let tool = match value.get("tool") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(name)) => name.trim().to_string(),
            Some(other) => {
                return Err(DispatchError::InvalidReply(format!(
                    "'tool' must be a string, got {}",
                    other
                )))
            }
        };
        if self.registry().spec(&tool).is_none() {
            return Err(DispatchError::UnknownTool(tool));
        }
        let arguments = match value.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        Ok(Some(Selection { tool, arguments }))
    }

    /// Pick a tool for `query` and run it. Always returns an outcome.
    pub async fn dispatch(&self, query: &str, strategy: Strategy) -> DispatchOutcome {
        match strategy {
            Strategy::Keyword => self.dispatch_keywords(query, false, None).await,
            Strategy::Llm | Strategy::Auto => match self.select_with_llm(query).await {
                Ok(selection) => self.finish(query, SelectionMethod::Llm, false, selection, None).await,
                Err(e) if strategy == Strategy::Auto => {
                    tracing::warn!(error = %e, "LLM tool selection failed, falling back to keywords");
                    let note = format!("LLM selection failed ({}); used keyword matching", e);
                    self.dispatch_keywords(query, true, Some(note)).await
                }
                Err(e) => DispatchOutcome {
                    query: query.to_string(),
                    method: SelectionMethod::Llm,
                    degraded: false,
                    tool: None,
                    arguments: Map::new(),
                    result: None,
                    is_error: true,
                    message: Some(e.to_string()),
                },
            },
        }
    }

    async fn dispatch_keywords(
        &self,
        query: &str,
        degraded: bool,
        note: Option<String>,
    ) -> DispatchOutcome {
        let selection = self.select_by_keywords(query).map(|rule| Selection {
            tool: rule.tool.clone(),
            arguments: rule.extract_arguments(query),
        });
        self.finish(query, SelectionMethod::Keyword, degraded, selection, note)
            .await
    }

    async fn finish(
        &self,
        query: &str,
        method: SelectionMethod,
        degraded: bool,
        selection: Option<Selection>,
        note: Option<String>,
    ) -> DispatchOutcome {
        let Some(selection) = selection else {
            tracing::info!(?method, "No tool matched query");
            return DispatchOutcome {
                query: query.to_string(),
                method,
                degraded,
                tool: None,
                arguments: Map::new(),
                result: None,
                is_error: false,
                message: Some(note.unwrap_or_else(|| "No matching tool for this query".to_string())),
            };
        };

        tracing::info!(tool = %selection.tool, ?method, degraded, "Dispatching tool call");
        let call = ToolCall::new(selection.tool.clone(), selection.arguments.clone());
        let Observation {
            content, is_error, ..
        } = self.executor.execute(&call).await;

        DispatchOutcome {
            query: query.to_string(),
            method,
            degraded,
            tool: Some(selection.tool),
            arguments: selection.arguments,
            result: Some(content),
            is_error,
            message: note,
        }
    }
}
