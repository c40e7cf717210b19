use std::path::PathBuf;

use async_trait::async_trait;

use crate::agent::types::RunSummary;
use crate::config::AgentConfig;
use crate::errors::QaResult;
use crate::reporting::{write_artifact, Reporter};

pub struct MarkdownReporter;

#[async_trait]
impl Reporter for MarkdownReporter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    async fn write(&self, summaries: &[RunSummary], config: &AgentConfig) -> QaResult<PathBuf> {
        let mut lines = vec![
            format!("# QA Pilot Report ({})", config.environment),
            String::new(),
            "| ID | Title | Status | Steps |".to_string(),
            "| --- | --- | --- | --- |".to_string(),
        ];
        lines.extend(summaries.iter().map(|s| {
            format!(
                "| {} | {} | {} | {} |",
                cell(&s.test_id),
                cell(&s.title),
                s.status,
                s.steps.len()
            )
        }));
        lines.push(String::new());
        write_artifact(&config.output_dir, "report.md", lines.join("\n")).await
    }
}

fn cell(raw: &str) -> String {
    raw.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::summaries;

    #[tokio::test]
    async fn writes_one_row_per_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_base_url("https://app.test");
        config.output_dir = dir.path().to_path_buf();

        let mut tests = summaries();
        tests[1].title = "Login | SSO".into();
        let path = MarkdownReporter.write(&tests, &config).await.unwrap();
        let md = std::fs::read_to_string(path).unwrap();
        assert!(md.starts_with("# QA Pilot Report (qa)"));
        assert!(md.contains("| T-1 | Checkout & pay | PASSED | 2 |"));
        assert!(md.contains("| T-2 | Login \\| SSO | FAILED | 1 |"));
    }
}
