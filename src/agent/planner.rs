use crate::agent::types::{ExecutionPlan, ExecutionPlanStep};
use crate::testcase::ParsedTest;

/// Hook tags checked in order; the first one found in a description wins.
const ASSERTION_HOOKS: [&str; 2] = ["toast", "grid"];

/// Turns parsed tests into execution plans.
///
/// Step ids come from a counter owned by the planner, so ids are unique across
/// every plan built by the same instance.
#[derive(Debug, Default)]
pub struct TestPlanner {
    next_step: u64,
}

impl TestPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build_plan(&mut self, test: &ParsedTest) -> ExecutionPlan {
        let steps = test
            .steps
            .iter()
            .map(|step| {
                self.next_step += 1;
                let description = step.description.trim().to_string();
                ExecutionPlanStep {
                    id: format!("step-{}", self.next_step),
                    label: format!("Step {}", step.index),
                    expected_outcome: derive_expected_outcome(&description),
                    assertion_hooks: derive_assertion_hooks(&description),
                    description,
                    possible_locators: Vec::new(),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(test = %test.id, steps = steps.len(), "built execution plan");
        ExecutionPlan {
            test: test.clone(),
            steps,
        }
    }
}

fn derive_expected_outcome(description: &str) -> Option<String> {
    description
        .to_lowercase()
        .starts_with("verify")
        .then(|| description.to_string())
}

fn derive_assertion_hooks(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    ASSERTION_HOOKS
        .iter()
        .find(|hook| lower.contains(*hook))
        .map(|hook| vec![hook.to_string()])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testcase::ParsedTestStep;

    fn parsed(id: &str, steps: &[(u32, &str)]) -> ParsedTest {
        ParsedTest {
            id: id.into(),
            title: "Orders".into(),
            url: None,
            preconditions: Vec::new(),
            steps: steps
                .iter()
                .map(|(index, description)| ParsedTestStep {
                    index: *index,
                    description: description.to_string(),
                })
                .collect(),
            assertions: Vec::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn verify_toast_step_gets_hook_and_expected_outcome() {
        let plan = TestPlanner::new().build_plan(&parsed("T-1", &[(1, "Verify toast appears")]));
        let step = &plan.steps[0];
        assert_eq!(step.assertion_hooks, vec!["toast"]);
        assert_eq!(step.expected_outcome.as_deref(), Some("Verify toast appears"));
        assert_eq!(step.label, "Step 1");
    }

    #[test]
    fn non_verify_steps_have_no_expected_outcome() {
        let plan = TestPlanner::new().build_plan(&parsed("T-1", &[(1, "Click the grid header")]));
        assert_eq!(plan.steps[0].expected_outcome, None);
        assert_eq!(plan.steps[0].assertion_hooks, vec!["grid"]);
    }

    #[test]
    fn toast_wins_over_grid() {
        let plan = TestPlanner::new().build_plan(&parsed("T-1", &[(1, "VERIFY grid shows a Toast")]));
        assert_eq!(plan.steps[0].assertion_hooks, vec!["toast"]);
        assert!(plan.steps[0].expected_outcome.is_some());
    }

    #[test]
    fn ids_are_unique_across_plans_and_labels_keep_authoring_index() {
        let mut planner = TestPlanner::new();
        let first = planner.build_plan(&parsed("T-1", &[(1, "Open"), (3, "Close")]));
        let second = planner.build_plan(&parsed("T-2", &[(1, "Open")]));
        let ids: Vec<_> = first.steps.iter().chain(&second.steps).map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["step-1", "step-2", "step-3"]);
        assert_eq!(first.steps[1].label, "Step 3");
        assert_eq!(second.test.id, "T-2");
    }

    #[test]
    fn separate_planners_count_independently() {
        let a = TestPlanner::new().build_plan(&parsed("T-1", &[(1, "Open")]));
        let b = TestPlanner::new().build_plan(&parsed("T-1", &[(1, "Open")]));
        assert_eq!(a.steps[0].id, b.steps[0].id);
    }
}
