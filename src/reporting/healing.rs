use std::path::PathBuf;

use async_trait::async_trait;

use crate::agent::types::RunSummary;
use crate::config::AgentConfig;
use crate::errors::QaResult;
use crate::reporting::{write_artifact, Reporter};

/// Digest of the steps that needed more than one locator attempt.
pub struct HealingInsightsReporter;

#[async_trait]
impl Reporter for HealingInsightsReporter {
    fn name(&self) -> &'static str {
        "healing-insights"
    }

    async fn write(&self, summaries: &[RunSummary], config: &AgentConfig) -> QaResult<PathBuf> {
        write_artifact(&config.output_dir, "healing_insights.md", render(summaries)).await
    }
}

fn render(summaries: &[RunSummary]) -> String {
    let mut lines = vec!["# Self-Healing Insights".to_string(), String::new()];
    let mut any = false;
    for summary in summaries {
        let healed: Vec<String> = summary
            .healed_steps()
            .map(|s| format!("- {}: {} attempt(s)", s.step.label, s.self_healing_attempts))
            .collect();
        if healed.is_empty() {
            continue;
        }
        any = true;
        lines.push(format!("## {} ({})", summary.title, summary.test_id));
        lines.extend(healed);
        lines.push(String::new());
    }
    if !any {
        lines.push("No self-healing activity recorded.".to_string());
        lines.push(String::new());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::StepStatus;
    use crate::reporting::fixtures::{step_result, summaries};

    #[test]
    fn lists_only_healed_steps() {
        let text = render(&summaries());
        assert!(text.contains("## Checkout & pay (T-1)\n- Step 2: 2 attempt(s)"));
        assert!(text.contains("## Login (T-2)\n- Step 3: 3 attempt(s)"));
        assert!(!text.contains("Step 1:"));
    }

    #[tokio::test]
    async fn quiet_runs_say_so() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_base_url("https://app.test");
        config.output_dir = dir.path().to_path_buf();
        let quiet = vec![RunSummary::new(
            "T-9".into(),
            "Quiet".into(),
            vec![step_result(1, StepStatus::Passed, 0)],
            vec![],
        )];

        let path = HealingInsightsReporter.write(&quiet, &config).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("No self-healing activity recorded."));
    }
}
