//! End-to-end runs of the ReAct loop against a scripted completion client.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use react_agent_demo::agent::{AgentKind, ReactAgent, RunConfig, TerminationReason, Turn};
use react_agent_demo::config::Config;
use react_agent_demo::llm::{ScriptStep, ScriptedClient};
use react_agent_demo::tools::{FnHandler, ParamSpec, ParamType, ToolRegistry, ToolSpec};

fn general_agent(steps: Vec<ScriptStep>) -> (ReactAgent, Arc<ScriptedClient>) {
    let llm = Arc::new(ScriptedClient::new(steps));
    let agent = ReactAgent::new(llm.clone(), "test-model", Arc::new(ToolRegistry::general()));
    (agent, llm)
}

#[tokio::test]
async fn calculator_run_answers_in_one_iteration() {
    let (agent, _) = general_agent(vec![
        ScriptStep::reply(
            "Thought: I should use the calculator\nAction: calculator\nAction Input: {\"expression\": \"2+3\"}",
        ),
        ScriptStep::reply("Thought: I now know the final answer\nFinal Answer: The result is 5."),
    ]);

    let result = agent
        .run("compute 2+3 then report", &RunConfig::new(5))
        .await;

    assert_eq!(result.terminated_reason, TerminationReason::Answered);
    assert_eq!(result.iterations_used, 1);
    assert!(result.final_answer.unwrap().contains('5'));
    assert!(result.error.is_none());

    let kinds: Vec<&str> = result
        .transcript
        .turns()
        .iter()
        .map(|t| match t {
            Turn::UserQuery { .. } => "query",
            Turn::AgentThought { .. } => "thought",
            Turn::ToolCall(_) => "call",
            Turn::Observation(_) => "observation",
            Turn::FinalAnswer { .. } => "answer",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["query", "thought", "call", "observation", "thought", "answer"]
    );
}

#[tokio::test]
async fn unknown_tool_runs_until_the_cap() {
    let step = "Thought: try the tool\nAction: nonexistent_tool\nAction Input: {}";
    let (agent, _) = general_agent(vec![
        ScriptStep::reply(step),
        ScriptStep::reply(step),
        ScriptStep::reply(step),
    ]);

    let result = agent.run("use nonexistent_tool", &RunConfig::new(3)).await;

    assert_eq!(result.terminated_reason, TerminationReason::MaxIterations);
    assert_eq!(result.iterations_used, 3);
    assert!(result.transcript.is_well_formed());
    for obs in result.transcript.observations() {
        assert!(obs.is_error);
        assert!(obs.content.contains("unknown tool: nonexistent_tool"));
    }
    assert!(result.error.unwrap().contains("iteration limit (3)"));
}

#[tokio::test]
async fn handler_error_feeds_back_into_reasoning() {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolSpec::new("flaky", "Fails on odd input")
                .with_param(ParamSpec::required("n", ParamType::Integer, "A number")),
            Arc::new(FnHandler(|args: &Map<String, Value>| -> anyhow::Result<Value> {
                let n = args.get("n").and_then(Value::as_i64).unwrap_or_default();
                if n % 2 == 1 {
                    anyhow::bail!("odd input {}", n);
                }
                Ok(json!(n / 2))
            })),
        )
        .unwrap();

    let llm = Arc::new(ScriptedClient::replies([
        "Action: flaky\nAction Input: {\"n\": 3}",
        "Thought: retry with an even number\nAction: flaky\nAction Input: {\"n\": \"4\"}",
        "Final Answer: 2",
    ]));
    let agent = ReactAgent::new(llm.clone(), "m", Arc::new(registry));

    let result = agent.run("halve something", &RunConfig::default()).await;

    assert_eq!(result.terminated_reason, TerminationReason::Answered);
    assert_eq!(result.iterations_used, 2);
    let steps = result.intermediate_steps();
    assert!(steps[0].is_error);
    assert!(steps[0].observation.contains("odd input 3"));
    assert_eq!(steps[1].observation, "2");

    let prompts = llm.requests().await;
    assert!(prompts[1].messages[1].content.contains("odd input 3"));
}

#[tokio::test]
async fn slow_tool_times_out_without_ending_the_run() {
    let config = Config::new("k", "http://localhost:1", "m");
    let llm = Arc::new(ScriptedClient::replies([
        "Action: sleepy\nAction Input: {}",
        "Final Answer: the tool was too slow",
    ]));

    struct Sleepy;

    #[async_trait::async_trait]
    impl react_agent_demo::tools::ToolHandler for Sleepy {
        async fn invoke(&self, _args: &Map<String, Value>) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!("done"))
        }
    }

    let mut registry = ToolRegistry::new();
    registry
        .register(ToolSpec::new("sleepy", "Sleeps"), Arc::new(Sleepy))
        .unwrap();
    let agent = ReactAgent::from_config(&config, llm, Arc::new(registry))
        .with_tool_timeout(Duration::from_millis(20));

    let result = agent.run("wake me", &RunConfig::default()).await;
    assert!(result.is_answered());
    assert!(result.intermediate_steps()[0].observation.contains("timed out"));
}

#[tokio::test]
async fn concurrent_runs_share_nothing() {
    let registry = Arc::new(ToolRegistry::general());
    let agents: Vec<ReactAgent> = (1..=4)
        .map(|i| {
            let llm = Arc::new(ScriptedClient::new([
                ScriptStep::Delayed(
                    Duration::from_millis(10 * (5 - i)),
                    format!("Action: calculator\nAction Input: {{\"expression\": \"{i}*{i}\"}}"),
                ),
                ScriptStep::reply(format!("Final Answer: {}", i * i)),
            ]));
            ReactAgent::new(llm, "m", Arc::clone(&registry))
        })
        .collect();

    let config = RunConfig::default();
    let results = join_all(
        agents
            .iter()
            .enumerate()
            .map(|(i, agent)| agent.run(if i % 2 == 0 { "even" } else { "odd" }, &config)),
    )
    .await;

    for (i, result) in results.iter().enumerate() {
        let n = (i + 1) as u64;
        assert!(result.is_answered());
        assert_eq!(result.final_answer.as_deref(), Some((n * n).to_string().as_str()));
        assert_eq!(result.intermediate_steps()[0].observation, (n * n).to_string());
        assert_eq!(result.transcript.len(), 4);
    }
    let ids: std::collections::HashSet<_> = results.iter().map(|r| r.run_id).collect();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_step() {
    let llm = Arc::new(ScriptedClient::replies([
        "Action: calculator\nAction Input: {\"expression\": \"1+1\"}",
        "Final Answer: 2",
    ]));
    let agent = ReactAgent::new(llm.clone(), "m", Arc::new(ToolRegistry::general()));
    let token = CancellationToken::new();
    token.cancel();

    let result = agent
        .run_with_cancel("1+1?", &RunConfig::default(), &token)
        .await;

    assert_eq!(result.terminated_reason, TerminationReason::Cancelled);
    assert_eq!(result.iterations_used, 0);
    assert!(result.final_answer.is_none());
    assert_eq!(llm.remaining().await, 2);
}

#[tokio::test]
async fn cancellation_during_a_tool_round_stops_at_the_next_step() {
    let token = CancellationToken::new();
    let signal = token.clone();

    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolSpec::new("stop_button", "Requests cancellation, then reports success"),
            Arc::new(FnHandler(move |_: &Map<String, Value>| -> anyhow::Result<Value> {
                signal.cancel();
                Ok(json!("pressed"))
            })),
        )
        .unwrap();

    let llm = Arc::new(ScriptedClient::replies([
        "Thought: press it\nAction: stop_button\nAction Input: {}",
        "Final Answer: should never be requested",
    ]));
    let agent = ReactAgent::new(llm.clone(), "m", Arc::new(registry));

    let result = agent
        .run_with_cancel("press the button", &RunConfig::default(), &token)
        .await;

    assert_eq!(result.terminated_reason, TerminationReason::Cancelled);
    assert_eq!(result.iterations_used, 1);
    assert!(result.final_answer.is_none());
    assert_eq!(result.intermediate_steps()[0].observation, "pressed");
    assert!(result.transcript.is_well_formed());
    assert_eq!(llm.requests().await.len(), 1);
    assert_eq!(llm.remaining().await, 1);
}

#[tokio::test]
async fn weather_agent_uses_its_profile() {
    let config = Config::new("k", "http://localhost:1", "m");
    let llm = Arc::new(ScriptedClient::replies([
        "Thought: look up Beijing\nAction: get_current_weather\nAction Input: Beijing",
        "Final Answer: Beijing is 18°C and cloudy.",
    ]));
    let agent = AgentKind::Weather.build(&config, llm.clone());

    let result = agent
        .run("北京今天天气怎么样？", &AgentKind::Weather.default_run_config(&config))
        .await;

    assert!(result.is_answered());
    let steps = result.intermediate_steps();
    assert_eq!(steps[0].tool_input["city"], json!("Beijing"));
    assert!(steps[0].observation.contains("Cloudy"));

    let prompts = llm.requests().await;
    assert!(prompts[0].messages[0].content.contains("get_weather_suggestion"));
    assert!(!prompts[0].messages[0].content.contains("**calculator**"));
}

#[test]
fn runs_on_a_plain_blocking_executor() {
    let (agent, _) = general_agent(vec![ScriptStep::reply("Final Answer: hi")]);
    let result = tokio_test::block_on(agent.run("hello", &RunConfig::default()));
    assert_eq!(result.final_answer.as_deref(), Some("hi"));
}
