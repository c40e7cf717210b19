//! Report writers. Each reporter reads the finished summaries and writes one artifact.

pub mod healing;
pub mod html;
pub mod json;
pub mod markdown;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::future::join_all;

use crate::agent::types::RunSummary;
use crate::config::AgentConfig;
use crate::errors::{QaError, QaResult};

pub use healing::HealingInsightsReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write the artifact under `config.output_dir` and return its path.
    async fn write(&self, summaries: &[RunSummary], config: &AgentConfig) -> QaResult<PathBuf>;
}

pub fn default_reporters() -> Vec<Box<dyn Reporter>> {
    vec![
        Box::new(HtmlReporter),
        Box::new(JsonReporter),
        Box::new(MarkdownReporter),
        Box::new(HealingInsightsReporter),
    ]
}

/// Run every reporter concurrently. Failures are logged and left out of the result.
pub async fn write_all(
    reporters: &[Box<dyn Reporter>],
    summaries: &[RunSummary],
    config: &AgentConfig,
) -> Vec<PathBuf> {
    let results = join_all(reporters.iter().map(|r| async move {
        (r.name(), r.write(summaries, config).await)
    }))
    .await;

    results
        .into_iter()
        .filter_map(|(name, result)| match result {
            Ok(path) => {
                tracing::info!(reporter = name, path = %path.display(), "report written");
                Some(path)
            }
            Err(e) => {
                tracing::error!(reporter = name, error = %e, "reporter failed");
                None
            }
        })
        .collect()
}

pub(crate) async fn write_artifact(dir: &Path, file_name: &str, contents: String) -> QaResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| QaError::Report(format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| QaError::Report(format!("cannot write {}: {e}", path.display())))?;
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl Reporter for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn write(&self, _: &[RunSummary], _: &AgentConfig) -> QaResult<PathBuf> {
            Err(QaError::Report("disk full".into()))
        }
    }

    #[tokio::test]
    async fn failing_reporter_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_base_url("https://app.test");
        config.output_dir = dir.path().to_path_buf();
        let mut reporters = default_reporters();
        reporters.insert(0, Box::new(Broken));

        let written = write_all(&reporters, &fixtures::summaries(), &config).await;
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["report.html", "report.json", "report.md", "healing_insights.md"]);
    }
}
