use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::types::{StepResult, StepStatus};
use crate::errors::QaResult;

/// One finished step, as written to the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub ts: i64,
    pub test_id: String,
    pub step_id: String,
    pub label: String,
    pub status: StepStatus,
    pub self_healing_attempts: u32,
    pub error: Option<String>,
}

impl JournalEntry {
    pub fn from_result(test_id: &str, result: &StepResult) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            test_id: test_id.to_string(),
            step_id: result.step.id.clone(),
            label: result.step.label.clone(),
            status: result.status,
            self_healing_attempts: result.self_healing_attempts,
            error: result.error_message.clone(),
        }
    }
}

/// Append-only JSONL record of a run, one line per finished step.
pub struct RunJournal {
    pub run_id: String,
    file_path: PathBuf,
}

impl RunJournal {
    pub fn new(output_dir: &Path) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let file_path = output_dir.join(format!("journal_{run_id}.jsonl"));
        Self { run_id, file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, entry: &JournalEntry) -> QaResult<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{line}")?;
        tracing::debug!(path = %self.file_path.display(), step = %entry.step_id, "journal entry appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(step: &str, status: StepStatus) -> JournalEntry {
        JournalEntry {
            ts: 0,
            test_id: "T-1".into(),
            step_id: step.into(),
            label: "Step 1".into(),
            status,
            self_healing_attempts: 0,
            error: None,
        }
    }

    #[test]
    fn appends_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = RunJournal::new(&dir.path().join("nested"));
        journal.append(&entry("step-1", StepStatus::Passed)).unwrap();
        journal.append(&entry("step-2", StepStatus::Failed)).unwrap();

        let name = journal.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("journal_{}.jsonl", journal.run_id));

        let text = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<JournalEntry> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![entry("step-1", StepStatus::Passed), entry("step-2", StepStatus::Failed)]);
        assert!(text.contains("\"status\":\"FAILED\""));
    }

    #[test]
    fn run_ids_differ() {
        let dir = tempfile::tempdir().unwrap();
        assert_ne!(RunJournal::new(dir.path()).run_id, RunJournal::new(dir.path()).run_id);
    }
}
