use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::thinker::{ThinkContext, Thinker};
use crate::agent::types::{ExecutionPlanStep, PlannedAction, StepResult, StepStatus};
use crate::browser::{ActionKind, ActionRequest, AutomationBackend, ObservedState};
use crate::config::{AgentConfig, TimeoutsConfig};
use crate::locators::{LocatorCandidate, SelfHealingLocator};

/// The slice of [`AgentConfig`] the executor reads.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub base_url: String,
    pub max_self_heal_attempts: u32,
    pub enable_self_healing: bool,
    pub timeouts: TimeoutsConfig,
}

impl From<&AgentConfig> for ExecutorSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            max_self_heal_attempts: config.max_self_heal_attempts,
            enable_self_healing: config.enable_self_healing,
            timeouts: config.timeouts.clone(),
        }
    }
}

impl ExecutorSettings {
    fn timeout_for(&self, kind: ActionKind) -> Duration {
        match kind {
            ActionKind::Navigate => self.timeouts.navigation(),
            ActionKind::Assert => self.timeouts.assertion(),
            _ => self.timeouts.element(),
        }
    }
}

/// Runs one plan step at a time: observe, plan, act with bounded retries, observe again.
///
/// The executor exclusively owns the locator cache and the action history;
/// both live as long as the executor does.
pub struct StepExecutor {
    backend: Arc<dyn AutomationBackend>,
    thinker: Thinker,
    locator: SelfHealingLocator,
    settings: ExecutorSettings,
    history: Vec<String>,
}

/// How an attempted action ended, before it is turned into a [`StepResult`].
struct Attempted {
    success: bool,
    attempts: u32,
    error: Option<String>,
}

impl StepExecutor {
    pub fn new(backend: Arc<dyn AutomationBackend>, thinker: Thinker, settings: ExecutorSettings) -> Self {
        Self {
            backend,
            thinker,
            locator: SelfHealingLocator::default(),
            settings,
            history: Vec::new(),
        }
    }

    pub async fn execute_step(&mut self, test_id: &str, step: &ExecutionPlanStep) -> StepResult {
        let before = self.backend.observe().await;
        let plan = self
            .thinker
            .plan(ThinkContext {
                step,
                observed: &before,
                previous_actions: &self.history,
            })
            .await
            .into_action();

        tracing::info!(
            test = test_id,
            step = %step.id,
            action = %plan.action_type,
            target = %plan.target_description,
            "executing step"
        );

        let mut action_logs = Vec::new();
        let attempted = if plan.action_type.is_interactive() {
            self.interact(test_id, step, &plan, &mut action_logs).await
        } else if plan.action_type == ActionKind::Navigate {
            self.navigate(&plan, &mut action_logs).await
        } else {
            action_logs.push(format!("noop: {}", plan.target_description));
            let observed = self.backend.observe().await;
            self.history.push("noop".to_string());
            return finish(step, StepStatus::Passed, action_logs, observed, 0, None);
        };

        let observed = self.backend.observe().await;
        if attempted.success {
            let healed = attempted.attempts.saturating_sub(1);
            if healed > 0 {
                tracing::info!(test = test_id, step = %step.id, healed, "step recovered by self-healing");
            }
            return finish(step, StepStatus::Passed, action_logs, observed, healed, None);
        }

        tracing::warn!(
            test = test_id,
            step = %step.id,
            attempts = attempted.attempts,
            error = attempted.error.as_deref().unwrap_or("unknown"),
            "step failed"
        );
        finish(
            step,
            StepStatus::Failed,
            action_logs,
            observed,
            attempted.attempts,
            attempted.error,
        )
    }

    // ── Navigate: one attempt, never touches locators ─────────────────────────

    async fn navigate(&mut self, plan: &PlannedAction, logs: &mut Vec<String>) -> Attempted {
        let destination = plan
            .input_value
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.settings.base_url.clone());

        let outcome = self
            .backend
            .perform_action(ActionRequest {
                locator: String::new(),
                kind: ActionKind::Navigate,
                value: Some(destination.clone()),
                timeout: self.settings.timeout_for(ActionKind::Navigate),
            })
            .await;

        if outcome.success {
            logs.push(format!("navigate {destination} -> ok"));
            self.history
                .push(format!("{}:{}", plan.action_type, plan.target_description));
            return Attempted {
                success: true,
                attempts: 0,
                error: None,
            };
        }

        let error = outcome
            .error_message
            .unwrap_or_else(|| format!("Navigation to {destination} failed"));
        logs.push(format!("navigate {destination} -> failed: {error}"));
        Attempted {
            success: false,
            attempts: 0,
            error: Some(error),
        }
    }

    // ── Interactive: walk merged candidates until one works or the budget runs out ──

    async fn interact(
        &mut self,
        test_id: &str,
        step: &ExecutionPlanStep,
        plan: &PlannedAction,
        logs: &mut Vec<String>,
    ) -> Attempted {
        let candidates = self.merge_candidates(test_id, step, &plan.candidate_locators);
        let mut attempts = 0u32;
        let mut error = None;

        for candidate in candidates {
            attempts += 1;
            let locator = candidate.to_locator();
            let outcome = self
                .backend
                .perform_action(ActionRequest {
                    locator: locator.clone(),
                    kind: plan.action_type,
                    value: plan.input_value.clone(),
                    timeout: self.settings.timeout_for(plan.action_type),
                })
                .await;

            if outcome.success {
                logs.push(format!("{} {locator} -> ok", plan.action_type));
                self.locator.record_success(test_id, step, candidate);
                self.history.push(format!("{}:{locator}", plan.action_type));
                return Attempted {
                    success: true,
                    attempts,
                    error: None,
                };
            }

            let message = outcome
                .error_message
                .unwrap_or_else(|| format!("{} failed on {locator}", plan.action_type));
            logs.push(format!("{} {locator} -> failed: {message}", plan.action_type));
            tracing::debug!(step = %step.id, attempt = attempts, %locator, error = %message, "candidate failed");
            error = Some(message);

            if !self.settings.enable_self_healing || attempts > self.settings.max_self_heal_attempts {
                break;
            }
        }

        Attempted {
            success: false,
            attempts,
            error: error.or_else(|| Some("No candidate locators available".to_string())),
        }
    }

    /// Planned tokens first, then cached or strategy candidates; duplicates keep
    /// their first position. Tokens that are not `strategy:value` are dropped.
    pub fn merge_candidates(
        &self,
        test_id: &str,
        step: &ExecutionPlanStep,
        planned_tokens: &[String],
    ) -> Vec<LocatorCandidate> {
        let planned = planned_tokens.iter().filter_map(|token| {
            let parsed = LocatorCandidate::from_token(token);
            if parsed.is_none() {
                tracing::debug!(%token, "discarding malformed locator token");
            }
            parsed
        });

        let mut seen = HashSet::new();
        planned
            .chain(self.locator.get_candidates(test_id, step))
            .filter(|candidate| seen.insert(candidate.clone()))
            .collect()
    }

    /// Summaries of every successful action so far, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn locator(&self) -> &SelfHealingLocator {
        &self.locator
    }
}

fn finish(
    step: &ExecutionPlanStep,
    status: StepStatus,
    action_logs: Vec<String>,
    observed_state: ObservedState,
    self_healing_attempts: u32,
    error_message: Option<String>,
) -> StepResult {
    StepResult {
        step: step.clone(),
        status,
        action_logs,
        observed_state,
        self_healing_attempts,
        error_message,
        failure_analysis: None,
        screenshot: None,
    }
}
