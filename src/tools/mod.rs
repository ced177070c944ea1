//! Tool registry and tool definitions.
//!
//! A tool is a named, schema-described callable. The registry is built once
//! at startup and then shared read-only by every agent run.

mod calculator;
mod datetime;
mod weather;

pub use calculator::{evaluate, format_number, Calculator, CalcError};
pub use datetime::{CurrentDate, CurrentTime, CurrentTimestamp, CurrentUtcTime};
pub use weather::{supported_cities, CurrentWeather, WeatherForecast, WeatherSuggestion};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(s)
    }
}

/// Schema of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Name, description and parameter schema advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// The parameter a bare text input should bind to: the only required
    /// parameter, or else the only parameter.
    pub fn sole_parameter(&self) -> Option<&ParamSpec> {
        let mut required = self.parameters.iter().filter(|p| p.required);
        match (required.next(), required.next()) {
            (Some(p), None) => Some(p),
            (None, None) if self.parameters.len() == 1 => self.parameters.first(),
            _ => None,
        }
    }

    /// JSON-schema rendering of the parameters.
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.param_type, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

/// The single capability every registered tool exposes.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<Value>;
}

/// A self-describing tool implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Vec<ParamSpec>;

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

struct ToolAdapter<T>(T);

#[async_trait]
impl<T: Tool> ToolHandler for ToolAdapter<T> {
    async fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        self.0.execute(args).await
    }
}

/// Adapter turning a plain synchronous closure into a handler.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&Map<String, Value>) -> anyhow::Result<Value> + Send + Sync,
{
    async fn invoke(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        (self.0)(args)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool already registered: {0}")]
    DuplicateName(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

struct RegisteredTool {
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
}

/// Registry of available tools, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator and date/time tools.
    pub fn general() -> Self {
        let mut registry = Self::new();
        registry.add_builtin(Calculator);
        registry.add_builtin(CurrentDate);
        registry.add_builtin(CurrentTime);
        registry.add_builtin(CurrentTimestamp);
        registry.add_builtin(CurrentUtcTime);
        registry
    }

    /// Mock weather lookup tools.
    pub fn weather() -> Self {
        let mut registry = Self::new();
        registry.add_builtin(CurrentWeather);
        registry.add_builtin(WeatherForecast);
        registry.add_builtin(WeatherSuggestion);
        registry
    }

    /// Every built-in tool.
    pub fn all() -> Self {
        let mut registry = Self::general();
        registry.add_builtin(CurrentWeather);
        registry.add_builtin(WeatherForecast);
        registry.add_builtin(WeatherSuggestion);
        registry
    }

    /// Register a tool under `spec.name`.
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateName(spec.name));
        }
        tracing::debug!(tool = %spec.name, "Registered tool");
        self.index.insert(spec.name.clone(), self.entries.len());
        self.entries.push(RegisteredTool { spec, handler });
        Ok(())
    }

    /// Register a self-describing tool.
    pub fn add<T: Tool + 'static>(&mut self, tool: T) -> Result<(), RegistryError> {
        let spec = tool.spec();
        self.register(spec, Arc::new(ToolAdapter(tool)))
    }

    fn add_builtin<T: Tool + 'static>(&mut self, tool: T) {
        // Built-in names are distinct constants; a clash is a programming error.
        if let Err(e) = self.add(tool) {
            tracing::error!("Failed to register built-in tool: {}", e);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ToolHandler>, RegistryError> {
        self.lookup(name).map(|(_, handler)| handler)
    }

    /// Spec and handler for `name`.
    pub fn lookup(&self, name: &str) -> Result<(&ToolSpec, Arc<dyn ToolHandler>), RegistryError> {
        self.index
            .get(name)
            .map(|&i| {
                let entry = &self.entries[i];
                (&entry.spec, Arc::clone(&entry.handler))
            })
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.entries[i].spec)
    }

    pub fn list_specs(&self) -> Vec<&ToolSpec> {
        self.entries.iter().map(|e| &e.spec).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
