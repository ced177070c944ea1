//! Execution step: resolve, validate and run one tool call.
//!
//! Every outcome is an [`Observation`]. Unknown tools, bad arguments, handler
//! errors and timeouts are reported back to the model as error observations.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Number, Value};

use super::error::AgentError;
use super::transcript::{Observation, ToolCall};
use crate::tools::{ParamType, ToolRegistry, ToolSpec};

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn execute(&self, call: &ToolCall) -> Observation {
        match self.try_execute(call).await {
            Ok(content) => Observation::success(&call.tool, content),
            Err(e) => {
                tracing::warn!(tool = %call.tool, error = %e, "Tool call failed");
                Observation::error(Some(&call.tool), format!("Error: {}", e))
            }
        }
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<String, AgentError> {
        let (spec, handler) =
            self.registry
                .lookup(&call.tool)
                .map_err(|_| AgentError::UnknownTool {
                    name: call.tool.clone(),
                    available: self.registry.names().join(", "),
                })?;

        let args = validate(spec, &call.arguments).map_err(|message| {
            AgentError::ArgumentValidation {
                tool: call.tool.clone(),
                message,
            }
        })?;

        tracing::debug!(tool = %call.tool, args = %serde_json::Value::Object(args.clone()), "Invoking tool");

        let result = tokio::time::timeout(self.timeout, handler.invoke(&args))
            .await
            .map_err(|_| AgentError::ToolExecution {
                tool: call.tool.clone(),
                message: format!("timed out after {}s", self.timeout.as_secs_f32()),
            })?
            .map_err(|e| AgentError::ToolExecution {
                tool: call.tool.clone(),
                message: e.to_string(),
            })?;

        Ok(match result {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }
}

/// Check `args` against the tool's schema, coercing values where the
/// conversion is lossless. Unknown keys pass through untouched.
fn validate(spec: &ToolSpec, args: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    let mut out = args.clone();
    for param in &spec.parameters {
        match args.get(&param.name) {
            None | Some(Value::Null) => {
                out.remove(&param.name);
                if param.required {
                    return Err(format!("missing required parameter: {}", param.name));
                }
            }
            Some(value) => {
                let coerced = coerce(value, param.param_type).ok_or_else(|| {
                    format!(
                        "invalid type for parameter {}: expected {}",
                        param.name, param.param_type
                    )
                })?;
                out.insert(param.name.clone(), coerced);
            }
        }
    }
    Ok(out)
}

fn coerce(value: &Value, expected: ParamType) -> Option<Value> {
    match (expected, value) {
        (ParamType::String, Value::String(_)) => Some(value.clone()),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        // Structured values become their JSON text.
        (ParamType::String, Value::Object(_) | Value::Array(_)) => {
            Some(Value::String(value.to_string()))
        }

        (ParamType::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
            }
        }
        (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

        (ParamType::Number, Value::Number(_)) => Some(value.clone()),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (ParamType::Object, Value::Object(_)) => Some(value.clone()),
        (ParamType::Object, Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        },

        (ParamType::Array, Value::Array(_)) => Some(value.clone()),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FnHandler, ParamSpec, ToolHandler};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(Arc::new(ToolRegistry::general()))
    }

    #[tokio::test]
    async fn runs_calculator() {
        let obs = executor()
            .execute(&ToolCall::new("calculator", args(json!({"expression": "2+3"}))))
            .await;
        assert!(!obs.is_error);
        assert_eq!(obs.content, "5");
        assert_eq!(obs.tool.as_deref(), Some("calculator"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation() {
        let obs = executor()
            .execute(&ToolCall::new("nonexistent_tool", Map::new()))
            .await;
        assert!(obs.is_error);
        assert!(obs.content.contains("unknown tool: nonexistent_tool"));
        assert!(obs.content.contains("calculator"));
    }

    #[tokio::test]
    async fn handler_error_becomes_observation() {
        let obs = executor()
            .execute(&ToolCall::new("calculator", args(json!({"expression": "1/0"}))))
            .await;
        assert!(obs.is_error);
        assert!(obs.content.starts_with("Error: tool 'calculator' failed"));
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ToolHandler for Counting {
        async fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(json!("ok"))
        }
    }

    #[tokio::test]
    async fn missing_parameter_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("lookup", "Look something up")
                    .with_param(ParamSpec::required("x", ParamType::String, "Key")),
                Arc::new(Counting(calls.clone())),
            )
            .unwrap();
        let executor = ToolExecutor::new(Arc::new(registry));

        let obs = executor.execute(&ToolCall::new("lookup", Map::new())).await;
        assert!(obs.is_error);
        assert!(obs.content.contains("missing required parameter: x"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let obs = executor
            .execute(&ToolCall::new("lookup", args(json!({"x": "k"}))))
            .await;
        assert_eq!(obs.content, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct Slow;

    #[async_trait]
    impl ToolHandler for Slow {
        async fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!("late"))
        }
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("slow", "Takes a while"), Arc::new(Slow))
            .unwrap();
        let executor =
            ToolExecutor::new(Arc::new(registry)).with_timeout(Duration::from_millis(50));

        let obs = executor.execute(&ToolCall::new("slow", Map::new())).await;
        assert!(obs.is_error);
        assert!(obs.content.contains("timed out"));
    }

    #[tokio::test]
    async fn numeric_strings_are_coerced() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("echo", "Echo")
                    .with_param(ParamSpec::required("days", ParamType::Integer, "Days"))
                    .with_param(ParamSpec::optional("loud", ParamType::Boolean, "Loud")),
                Arc::new(FnHandler(|a: &Map<String, Value>| -> anyhow::Result<Value> {
                    Ok(Value::Object(a.clone()))
                })),
            )
            .unwrap();
        let executor = ToolExecutor::new(Arc::new(registry));

        let obs = executor
            .execute(&ToolCall::new("echo", args(json!({"days": "3", "loud": "true"}))))
            .await;
        assert_eq!(obs.content, r#"{"days":3,"loud":true}"#);

        let obs = executor
            .execute(&ToolCall::new("echo", args(json!({"days": "three"}))))
            .await;
        assert!(obs
            .content
            .contains("invalid type for parameter days: expected integer"));
    }

    #[tokio::test]
    async fn weather_report_object_is_accepted_as_text() {
        let executor = ToolExecutor::new(Arc::new(ToolRegistry::all()));
        let report = json!({"city": "Shanghai", "temperature": "25°C", "weather": "Light rain"});

        let obs = executor
            .execute(&ToolCall::new(
                "get_weather_suggestion",
                args(json!({"weather_info": report.clone()})),
            ))
            .await;
        assert!(!obs.is_error, "{}", obs.content);
        assert!(obs.content.contains("umbrella"));

        let obs = executor
            .execute(&ToolCall::new(
                "get_weather_suggestion",
                args(json!({"weather_info": report.to_string()})),
            ))
            .await;
        assert!(!obs.is_error);
        assert!(obs.content.contains("comfortable"));
    }

    #[test]
    fn coerce_rules() {
        assert_eq!(coerce(&json!(3.0), ParamType::Integer), Some(json!(3)));
        assert_eq!(coerce(&json!(3.5), ParamType::Integer), None);
        assert_eq!(coerce(&json!("2.5"), ParamType::Number), Some(json!(2.5)));
        assert_eq!(coerce(&json!(7), ParamType::String), Some(json!("7")));
        assert_eq!(coerce(&json!([1]), ParamType::String), Some(json!("[1]")));
        assert_eq!(coerce(&json!({"a": 1}), ParamType::Integer), None);
        assert_eq!(
            coerce(&json!("{\"a\":1}"), ParamType::Object),
            Some(json!({"a": 1}))
        );
    }
}
