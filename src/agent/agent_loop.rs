//! Core agent loop implementation.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::{Config, MAX_PARSE_RETRIES};
use crate::llm::LlmClient;
use crate::tools::ToolRegistry;

use super::error::AgentError;
use super::executor::ToolExecutor;
use super::reasoning::{Proposal, ReasoningError, ReasoningStep};
use super::transcript::{Observation, ToolCall, Transcript, Turn};
use super::types::{RunConfig, RunResult, TerminationReason};

const DEFAULT_PARSE_RETRIES: u32 = 1;

enum LoopState {
    Start,
    Thinking,
    Acting(ToolCall),
    Observing,
    Done(String),
    Aborted {
        reason: TerminationReason,
        answer: Option<String>,
        error: Option<String>,
    },
}

/// A ReAct agent: reasoning and tool execution alternating over a transcript.
///
/// The agent holds no per-run state, so one instance can serve any number of
/// concurrent runs.
pub struct ReactAgent {
    name: String,
    reasoning: ReasoningStep,
    executor: ToolExecutor,
    parse_retries: u32,
}

impl ReactAgent {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: "react".to_string(),
            reasoning: ReasoningStep::new(llm, model),
            executor: ToolExecutor::new(registry),
            parse_retries: DEFAULT_PARSE_RETRIES,
        }
    }

    /// Create an agent using the model, sampling and timeout settings in `config`.
    pub fn from_config(config: &Config, llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        let mut agent = Self::new(llm, config.llm.model.clone(), registry)
            .with_temperature(Some(config.llm.temperature))
            .with_tool_timeout(config.tool_timeout)
            .with_parse_retries(config.parse_retries);
        agent.reasoning = agent.reasoning.with_max_tokens(config.llm.max_tokens);
        agent
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.reasoning = self.reasoning.with_instructions(Some(instructions.into()));
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.reasoning = self.reasoning.with_temperature(temperature);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    /// Consecutive unparseable replies tolerated, capped at [`MAX_PARSE_RETRIES`].
    pub fn with_parse_retries(mut self, retries: u32) -> Self {
        if retries > MAX_PARSE_RETRIES {
            tracing::warn!(requested = retries, max = MAX_PARSE_RETRIES, "Clamping parse retries");
        }
        self.parse_retries = retries.min(MAX_PARSE_RETRIES);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Run `query` to completion. Always returns a result.
    pub async fn run(&self, query: &str, config: &RunConfig) -> RunResult {
        self.run_with_cancel(query, config, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), stopping before the next reasoning step once
    /// `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> RunResult {
        let run_id = Uuid::new_v4();
        let registry = Arc::clone(self.executor.registry());
        let tools = registry.list_specs();

        let mut transcript = Transcript::new();
        let mut iterations_used = 0usize;
        let mut parse_failures = 0u32;
        let mut state = LoopState::Start;

        tracing::info!(
            agent = %self.name,
            %run_id,
            max_iterations = config.max_iterations,
            "Starting run"
        );

        loop {
            state = match state {
                LoopState::Start => {
                    transcript.push_query(query);
                    self.log_turn(run_id, config, &transcript);
                    LoopState::Thinking
                }

                LoopState::Thinking => {
                    if cancel.is_cancelled() {
                        LoopState::Aborted {
                            reason: TerminationReason::Cancelled,
                            answer: None,
                            error: Some("run cancelled".to_string()),
                        }
                    } else if iterations_used >= config.max_iterations {
                        self.limit_reached(&transcript, config.max_iterations)
                    } else {
                        tracing::debug!(%run_id, iteration = iterations_used + 1, "Thinking");
                        match self.reasoning.propose(&transcript, &tools).await {
                            Ok(proposal) => {
                                parse_failures = 0;
                                match proposal {
                                    Proposal::FinalAnswer { thought, answer } => {
                                        if let Some(thought) = thought {
                                            transcript.push_thought(&thought);
                                            self.log_turn(run_id, config, &transcript);
                                        }
                                        LoopState::Done(answer)
                                    }
                                    Proposal::ToolCall { thought, call } => {
                                        if let Some(thought) = thought {
                                            transcript.push_thought(&thought);
                                            self.log_turn(run_id, config, &transcript);
                                        }
                                        iterations_used += 1;
                                        LoopState::Acting(call)
                                    }
                                }
                            }
                            Err(ReasoningError::Parse { error, raw }) => {
                                parse_failures += 1;
                                let err = AgentError::Parse(error);
                                tracing::warn!(
                                    %run_id,
                                    failures = parse_failures,
                                    error = %err,
                                    "Unparseable model reply"
                                );
                                tracing::trace!(%run_id, reply = %raw, "Rejected reply");
                                if parse_failures > self.parse_retries {
                                    LoopState::Aborted {
                                        reason: TerminationReason::Error,
                                        answer: None,
                                        error: Some(err.to_string()),
                                    }
                                } else {
                                    transcript.push_note(Observation::error(
                                        None,
                                        format!(
                                            "Error: {}. Reply with 'Action:' followed by 'Action Input:', \
                                             or with 'Final Answer:'.",
                                            err
                                        ),
                                    ));
                                    self.log_turn(run_id, config, &transcript);
                                    LoopState::Thinking
                                }
                            }
                            Err(ReasoningError::Service(e)) => {
                                let err = AgentError::ExternalService(e);
                                tracing::error!(%run_id, error = %err, "Completion service failed");
                                LoopState::Aborted {
                                    reason: TerminationReason::Error,
                                    answer: None,
                                    error: Some(err.to_string()),
                                }
                            }
                        }
                    }
                }

                LoopState::Acting(call) => {
                    let observation = self.executor.execute(&call).await;
                    transcript.push_action(call, observation);
                    if let [.., call_turn, _] = transcript.turns() {
                        self.log(run_id, config, call_turn);
                    }
                    self.log_turn(run_id, config, &transcript);
                    LoopState::Observing
                }

                LoopState::Observing => {
                    if iterations_used >= config.max_iterations {
                        self.limit_reached(&transcript, config.max_iterations)
                    } else {
                        LoopState::Thinking
                    }
                }

                LoopState::Done(answer) => {
                    transcript.push_final_answer(&answer);
                    self.log_turn(run_id, config, &transcript);
                    tracing::info!(agent = %self.name, %run_id, iterations_used, "Run answered");
                    return RunResult {
                        run_id,
                        final_answer: Some(answer),
                        iterations_used,
                        transcript,
                        terminated_reason: TerminationReason::Answered,
                        error: None,
                    };
                }

                LoopState::Aborted {
                    reason,
                    answer,
                    error,
                } => {
                    tracing::info!(
                        agent = %self.name,
                        %run_id,
                        iterations_used,
                        reason = ?reason,
                        "Run aborted"
                    );
                    return RunResult {
                        run_id,
                        final_answer: answer,
                        iterations_used,
                        transcript,
                        terminated_reason: reason,
                        error,
                    };
                }
            };
        }
    }

    fn limit_reached(&self, transcript: &Transcript, max_iterations: usize) -> LoopState {
        let answer = transcript
            .last_thought()
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!(
                    "Unable to complete the request within {} iterations.",
                    max_iterations
                )
            });
        LoopState::Aborted {
            reason: TerminationReason::MaxIterations,
            answer: Some(answer),
            error: Some(AgentError::IterationLimitExceeded(max_iterations).to_string()),
        }
    }

    fn log_turn(&self, run_id: Uuid, config: &RunConfig, transcript: &Transcript) {
        if let Some(turn) = transcript.last() {
            self.log(run_id, config, turn);
        }
    }

    fn log(&self, run_id: Uuid, config: &RunConfig, turn: &Turn) {
        let text = match turn {
            Turn::UserQuery { content } => format!("Question: {}", content),
            Turn::AgentThought { content } => format!("Thought: {}", content),
            Turn::ToolCall(call) => format!(
                "Action: {} {}",
                call.tool,
                serde_json::Value::Object(call.arguments.clone())
            ),
            Turn::Observation(obs) => format!("Observation: {}", truncate_for_log(&obs.content, 1000)),
            Turn::FinalAnswer { content } => format!("Final Answer: {}", content),
        };
        if config.verbose {
            tracing::info!(agent = %self.name, %run_id, "{}", text);
        } else {
            tracing::debug!(agent = %self.name, %run_id, "{}", text);
        }
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    } else {
        s.to_string()
    }
}
