use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::agent::types::RunSummary;
use crate::config::{AgentConfig, Environment};
use crate::errors::QaResult;
use crate::reporting::{write_artifact, Reporter};

pub struct JsonReporter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    environment: Environment,
    tests: &'a [RunSummary],
}

#[async_trait]
impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn write(&self, summaries: &[RunSummary], config: &AgentConfig) -> QaResult<PathBuf> {
        let report = JsonReport {
            generated_at: chrono::Utc::now(),
            environment: config.environment,
            tests: summaries,
        };
        write_artifact(&config.output_dir, "report.json", serde_json::to_string_pretty(&report)?).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::reporting::fixtures::summaries;

    #[tokio::test]
    async fn dumps_full_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::with_base_url("https://app.test");
        config.output_dir = dir.path().to_path_buf();

        let path = JsonReporter.write(&summaries(), &config).await.unwrap();
        let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["environment"], "qa");
        assert!(json["generatedAt"].is_string());
        assert_eq!(json["tests"][1]["status"], "FAILED");
        assert_eq!(json["tests"][0]["steps"][1]["selfHealingAttempts"], 2);
    }
}
