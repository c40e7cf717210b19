use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::executor::{ExecutorSettings, StepExecutor};
use crate::agent::journal::{JournalEntry, RunJournal};
use crate::agent::login::{LoginDetector, OperatorPrompt, StdinPrompt};
use crate::agent::planner::TestPlanner;
use crate::agent::thinker::Thinker;
use crate::agent::types::{RunSummary, StepResult};
use crate::analysis::FailureAnalyzer;
use crate::browser::AutomationBackend;
use crate::config::{AgentConfig, ScreenshotPolicy};
use crate::errors::QaResult;
use crate::llm::{ProviderRegistry, ReasoningBackend, Role};
use crate::reporting::{default_reporters, write_all, Reporter};
use crate::testcase::{ParsedTest, TestParser};

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub summaries: Vec<RunSummary>,
    /// Test files that failed to parse, with the parse error.
    pub skipped: Vec<(PathBuf, String)>,
    pub reports: Vec<PathBuf>,
}

impl RunOutcome {
    pub fn all_passed(&self) -> bool {
        self.summaries.iter().all(|s| s.steps.iter().all(StepResult::passed))
    }
}

/// Wires planner, executor, failure analysis, journal and reporters into one run.
///
/// Tests run one after another against a single backend session; the executor's
/// locator cache and action history carry over from test to test.
pub struct AgentRunner {
    config: AgentConfig,
    backend: Arc<dyn AutomationBackend>,
    planner: TestPlanner,
    executor: StepExecutor,
    analyzer: FailureAnalyzer,
    journal: RunJournal,
    reporters: Vec<Box<dyn Reporter>>,
    login: LoginDetector,
    operator: Arc<dyn OperatorPrompt>,
}

impl AgentRunner {
    pub fn new(
        config: AgentConfig,
        backend: Arc<dyn AutomationBackend>,
        planning: Arc<dyn ReasoningBackend>,
        analysis: Arc<dyn ReasoningBackend>,
    ) -> Self {
        let executor = StepExecutor::new(
            backend.clone(),
            Thinker::new(planning),
            ExecutorSettings::from(&config),
        );
        Self {
            journal: RunJournal::new(&config.output_dir),
            config,
            backend,
            planner: TestPlanner::new(),
            executor,
            analyzer: FailureAnalyzer::new(analysis),
            reporters: default_reporters(),
            login: LoginDetector,
            operator: Arc::new(StdinPrompt),
        }
    }

    /// Validate the config and resolve reasoning backends for both roles.
    pub fn from_config(config: AgentConfig, backend: Arc<dyn AutomationBackend>) -> QaResult<Self> {
        config.validate()?;
        let registry = ProviderRegistry::from_config(&config.reasoning);
        let planning = registry.backend_for_role(Role::Planning)?;
        let analysis = registry.backend_for_role(Role::Analysis)?;
        Ok(Self::new(config, backend, planning, analysis))
    }

    pub fn with_reporters(mut self, reporters: Vec<Box<dyn Reporter>>) -> Self {
        self.reporters = reporters;
        self
    }

    pub fn with_operator_prompt(mut self, operator: Arc<dyn OperatorPrompt>) -> Self {
        self.operator = operator;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.journal.run_id
    }

    pub fn journal_path(&self) -> &Path {
        self.journal.path()
    }

    /// Parse every `*.txt` file in `dir` (lexicographic order) and run them.
    /// Files that fail to parse are logged and skipped.
    pub async fn run_from_directory(&mut self, dir: &Path) -> QaResult<RunOutcome> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }
        files.sort();
        tracing::info!(dir = %dir.display(), files = files.len(), "discovered test files");

        let mut tests = Vec::new();
        let mut skipped = Vec::new();
        for path in files {
            match TestParser.parse_file(&path).await {
                Ok(test) => tests.push(test),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "skipping unparseable test file");
                    skipped.push((path, e.to_string()));
                }
            }
        }

        let mut outcome = self.run_tests(&tests).await;
        outcome.skipped = skipped;
        Ok(outcome)
    }

    pub async fn run_tests(&mut self, tests: &[ParsedTest]) -> RunOutcome {
        tracing::info!(run = %self.journal.run_id, tests = tests.len(), env = %self.config.environment, "run started");
        let mut summaries = Vec::with_capacity(tests.len());
        for test in tests {
            summaries.push(self.run_test(test).await);
        }

        let reports = write_all(&self.reporters, &summaries, &self.config).await;
        let passed = summaries.iter().filter(|s| s.steps.iter().all(StepResult::passed)).count();
        tracing::info!(
            run = %self.journal.run_id,
            passed,
            failed = summaries.len() - passed,
            journal = %self.journal.path().display(),
            "run finished"
        );

        RunOutcome {
            summaries,
            skipped: Vec::new(),
            reports,
        }
    }

    async fn run_test(&mut self, test: &ParsedTest) -> RunSummary {
        let plan = self.planner.build_plan(test);
        tracing::info!(test = %test.id, title = %test.title, steps = plan.steps.len(), "test started");

        if self.config.enable_manual_login_pause {
            self.pause_for_login(test).await;
        }

        let mut results = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let mut result = self.executor.execute_step(&test.id, step).await;

            if !result.passed() && self.config.enable_failure_analysis {
                let analysis = self
                    .analyzer
                    .analyze(&step.description, result.error_message.as_deref(), &result.observed_state)
                    .await;
                tracing::info!(
                    test = %test.id,
                    step = %step.id,
                    root_cause = %analysis.root_cause_class,
                    confidence = analysis.confidence,
                    "failure analyzed"
                );
                result = result.with_failure_analysis(analysis);
            }

            let capture = match self.config.capture_screenshots {
                ScreenshotPolicy::OnStep => true,
                ScreenshotPolicy::OnFailure => !result.passed(),
                ScreenshotPolicy::None => false,
            };
            if capture {
                match self.backend.capture_screenshot(&format!("{}_{}", test.id, step.id)).await {
                    Ok(Some(path)) => result = result.with_screenshot(path),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(step = %step.id, error = %e, "screenshot capture failed"),
                }
            }

            if let Err(e) = self.journal.append(&JournalEntry::from_result(&test.id, &result)) {
                tracing::warn!(error = %e, "failed to append journal entry");
            }
            results.push(result);
        }

        let summary = RunSummary::new(test.id.clone(), test.title.clone(), results, test.tags.clone());
        tracing::info!(test = %test.id, status = %summary.status, "test finished");
        summary
    }

    async fn pause_for_login(&self, test: &ParsedTest) {
        let state = self.backend.observe().await;
        if !self.login.is_login_page(&state) {
            return;
        }
        tracing::info!(test = %test.id, url = %state.url, "login page detected, waiting for operator");
        let message = format!(
            "Login page detected before test {}. Complete sign-in in the browser, then press Enter to continue.",
            test.id
        );
        if let Err(e) = self.operator.wait_for_confirmation(&message).await {
            tracing::warn!(error = %e, "operator confirmation failed, continuing");
        }
    }
}
