//! Run configuration and result types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transcript::{IntermediateStep, Transcript};

/// Per-run limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub max_iterations: usize,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Answered,
    MaxIterations,
    Error,
    Cancelled,
}

/// Outcome of one run. Always produced, whatever happened.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub final_answer: Option<String>,
    pub iterations_used: usize,
    pub transcript: Transcript,
    pub terminated_reason: TerminationReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn is_answered(&self) -> bool {
        self.terminated_reason == TerminationReason::Answered
    }

    pub fn intermediate_steps(&self) -> Vec<IntermediateStep> {
        self.transcript.intermediate_steps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(TerminationReason::MaxIterations).unwrap(),
            json!("max_iterations")
        );
    }

    #[test]
    fn default_run_config() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.max_iterations, 5);
        assert!(!cfg.verbose);
        assert!(RunConfig::new(2).verbose(true).verbose);
    }
}
