use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::FailureAnalysis;
use crate::browser::{ActionKind, ObservedState};
use crate::testcase::ParsedTest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Passed,
    Failed,
    /// Reserved; never produced by the executor.
    SoftFailed,
    /// Reserved; never produced by the executor.
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepStatus::Passed => "PASSED",
            StepStatus::Failed => "FAILED",
            StepStatus::SoftFailed => "SOFT_FAILED",
            StepStatus::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}

/// One planned step. Immutable once built by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlanStep {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
    pub assertion_hooks: Vec<String>,
    /// Pre-computed `strategy:value` tokens.
    pub possible_locators: Vec<String>,
}

/// Steps in execution order; the executor never reorders or skips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub test: ParsedTest,
    pub steps: Vec<ExecutionPlanStep>,
}

/// The next operation for a step, consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedAction {
    pub action_type: ActionKind,
    pub target_description: String,
    pub candidate_locators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step: ExecutionPlanStep,
    pub status: StepStatus,
    pub action_logs: Vec<String>,
    pub observed_state: ObservedState,
    pub self_healing_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_analysis: Option<FailureAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }

    pub fn with_failure_analysis(mut self, analysis: FailureAnalysis) -> Self {
        self.failure_analysis = Some(analysis);
        self
    }

    pub fn with_screenshot(mut self, path: PathBuf) -> Self {
        self.screenshot = Some(path);
        self
    }
}

/// Per-test aggregate handed to the reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub test_id: String,
    pub title: String,
    pub status: StepStatus,
    pub steps: Vec<StepResult>,
    pub tags: Vec<String>,
}

impl RunSummary {
    /// Status is PASSED iff every step passed.
    pub fn new(test_id: String, title: String, steps: Vec<StepResult>, tags: Vec<String>) -> Self {
        let status = if steps.iter().all(StepResult::passed) {
            StepStatus::Passed
        } else {
            StepStatus::Failed
        };
        Self {
            test_id,
            title,
            status,
            steps,
            tags,
        }
    }

    pub fn healed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.self_healing_attempts > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: StepStatus, n: usize) -> StepResult {
        StepResult {
            step: ExecutionPlanStep {
                id: format!("step-{n}"),
                label: format!("Step {n}"),
                description: "Click Save".into(),
                expected_outcome: None,
                assertion_hooks: Vec::new(),
                possible_locators: Vec::new(),
            },
            status,
            action_logs: Vec::new(),
            observed_state: ObservedState::blank("about:blank", ""),
            self_healing_attempts: 0,
            error_message: None,
            failure_analysis: None,
            screenshot: None,
        }
    }

    #[test]
    fn summary_passes_only_when_every_step_passes() {
        let steps: Vec<_> = (1..=3).map(|n| result(StepStatus::Passed, n)).collect();
        let summary = RunSummary::new("T-1".into(), "Login".into(), steps.clone(), vec![]);
        assert_eq!(summary.status, StepStatus::Passed);

        for flip in 0..steps.len() {
            let mut flipped = steps.clone();
            flipped[flip].status = StepStatus::Failed;
            let summary = RunSummary::new("T-1".into(), "Login".into(), flipped, vec![]);
            assert_eq!(summary.status, StepStatus::Failed);
        }
    }

    #[test]
    fn empty_test_counts_as_passed() {
        let summary = RunSummary::new("T-2".into(), "Empty".into(), vec![], vec![]);
        assert_eq!(summary.status, StepStatus::Passed);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&StepStatus::SoftFailed).unwrap(), "\"SOFT_FAILED\"");
        assert_eq!(StepStatus::Passed.to_string(), "PASSED");
    }
}
