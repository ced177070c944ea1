//! Deterministic completion client that replays a fixed script.
//!
//! Used by tests and offline demos to drive the agent loop without a network
//! call. Every request is recorded so callers can inspect the prompts.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CompletionRequest, LlmClient, LlmError};

/// One scripted completion.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this text.
    Reply(String),
    /// Fail as if credentials were rejected.
    Unauthorized,
    /// Fail as if the service were unreachable.
    Unreachable(String),
    /// Sleep, then return the text.
    Delayed(Duration, String),
}

impl ScriptStep {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

pub struct ScriptedClient {
    steps: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Build a client that replies with each string in order.
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(ScriptStep::reply))
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.steps.lock().await.len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().await.push(request.clone());
        let step = self.steps.lock().await.pop_front();

        match step {
            Some(ScriptStep::Reply(text)) => Ok(text),
            Some(ScriptStep::Unauthorized) => Err(LlmError::Unauthorized(401)),
            Some(ScriptStep::Unreachable(reason)) => Err(LlmError::Transport(reason)),
            Some(ScriptStep::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(LlmError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_runs_dry() {
        let client = ScriptedClient::new([ScriptStep::reply("one"), ScriptStep::Unauthorized]);
        let req = CompletionRequest::default();

        assert_eq!(client.complete(&req).await.unwrap(), "one");
        assert!(matches!(
            client.complete(&req).await,
            Err(LlmError::Unauthorized(401))
        ));
        assert!(matches!(client.complete(&req).await, Err(LlmError::EmptyResponse)));
        assert_eq!(client.requests().await.len(), 3);
    }
}
