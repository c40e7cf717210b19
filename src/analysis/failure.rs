use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::thinker::VISIBLE_TEXT_SAMPLE;
use crate::browser::ObservedState;
use crate::llm::response::{string_field, string_list_field};
use crate::llm::{salvage_object, FallbackReason, ReasoningBackend, Salvaged};

/// Confidence attached to heuristic classifications.
pub const HEURISTIC_CONFIDENCE: f64 = 0.35;

const DEFAULT_MODEL_CONFIDENCE: f64 = 0.5;

/// Closed set of root-cause classes for a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootCause {
    #[serde(rename = "Locator/UI change")]
    LocatorUiChange,
    #[serde(rename = "Timing/Flakiness")]
    TimingFlakiness,
    #[serde(rename = "Data/Test setup")]
    DataTestSetup,
    #[serde(rename = "Business rule")]
    BusinessRule,
    #[serde(rename = "Environment/Backend")]
    EnvironmentBackend,
    #[serde(rename = "Permissions/Auth")]
    PermissionsAuth,
    #[serde(rename = "Blocking UI")]
    BlockingUi,
}

impl RootCause {
    pub const ALL: [RootCause; 7] = [
        RootCause::LocatorUiChange,
        RootCause::TimingFlakiness,
        RootCause::DataTestSetup,
        RootCause::BusinessRule,
        RootCause::EnvironmentBackend,
        RootCause::PermissionsAuth,
        RootCause::BlockingUi,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RootCause::LocatorUiChange => "Locator/UI change",
            RootCause::TimingFlakiness => "Timing/Flakiness",
            RootCause::DataTestSetup => "Data/Test setup",
            RootCause::BusinessRule => "Business rule",
            RootCause::EnvironmentBackend => "Environment/Backend",
            RootCause::PermissionsAuth => "Permissions/Auth",
            RootCause::BlockingUi => "Blocking UI",
        }
    }

    /// Case-insensitive match on the label.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.label().eq_ignore_ascii_case(raw))
    }

    fn suggested_next_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            RootCause::LocatorUiChange => &[
                "Inspect DOM snapshot for the renamed or moved element",
                "Update the step description or add a stable data-testid",
            ],
            RootCause::TimingFlakiness => &[
                "Re-run the step to confirm flakiness",
                "Capture console logs and increase the element timeout",
            ],
            RootCause::DataTestSetup => &["Verify preconditions and seed data for the test"],
            RootCause::BusinessRule => &["Confirm the expected behaviour with the product owner"],
            RootCause::EnvironmentBackend => &[
                "Check failing network calls and backend health",
                "Retry once the environment is stable",
            ],
            RootCause::PermissionsAuth => &["Verify the test account's session and permissions"],
            RootCause::BlockingUi => &["Dismiss the blocking dialog or overlay before the step"],
        };
        actions.iter().map(|a| a.to_string()).collect()
    }
}

impl std::fmt::Display for RootCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureAnalysis {
    pub root_cause_class: RootCause,
    pub confidence: f64,
    pub short_reason: String,
    pub detailed_analysis: Vec<String>,
    pub suggested_next_actions: Vec<String>,
}

/// Post-hoc diagnosis of a failed step.
pub struct FailureAnalyzer {
    backend: Arc<dyn ReasoningBackend>,
}

impl FailureAnalyzer {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }

    /// Always returns an analysis; a model failure yields the heuristic classification.
    pub async fn analyze(
        &self,
        step_description: &str,
        error_message: Option<&str>,
        observed: &ObservedState,
    ) -> FailureAnalysis {
        match self.classify(step_description, error_message, observed).await {
            Ok(analysis) => analysis,
            Err(reason) => {
                tracing::warn!(step = step_description, %reason, "falling back to heuristic failure analysis");
                heuristic_analysis(step_description, error_message, observed)
            }
        }
    }

    async fn classify(
        &self,
        step_description: &str,
        error_message: Option<&str>,
        observed: &ObservedState,
    ) -> Result<FailureAnalysis, FallbackReason> {
        let prompt = build_prompt(step_description, error_message, observed);
        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| FallbackReason::Backend(e.to_string()))?;
        match salvage_object(&raw) {
            Salvaged::Recovered(map) => {
                analysis_from_object(&map, step_description, error_message, observed)
            }
            Salvaged::Unrecoverable => Err(FallbackReason::Unparseable),
        }
    }
}

pub fn build_prompt(step_description: &str, error_message: Option<&str>, observed: &ObservedState) -> String {
    let classes = RootCause::ALL
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");
    let visible_text = observed
        .visible_text
        .iter()
        .take(VISIBLE_TEXT_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ");

    let mut lines = vec![
        "You are a senior QA engineer diagnosing a failed UI test step.".to_string(),
        format!("Classify the root cause into exactly one of: {classes}."),
        r#"Respond with JSON only: {"rootCauseClass": string, "confidence": number between 0 and 1, "shortReason": string, "detailedAnalysis": string[], "suggestedNextActions": string[]}."#.to_string(),
        format!("Step: {step_description}"),
        format!("Error: {}", error_message.unwrap_or("Unknown failure")),
        format!("Current URL: {}", observed.url),
        format!("Visible Text Sample: {visible_text}"),
    ];
    lines.extend(evidence_lines(observed));
    lines.join("\n")
}

fn evidence_lines(observed: &ObservedState) -> Vec<String> {
    let console = observed
        .console_errors()
        .map(|entry| format!("Console error: {}", entry.message));
    let network = observed.network_errors().map(|event| {
        let mut line = format!("Network error: {} {} -> {}", event.method, event.url, event.status);
        if let Some(text) = &event.error_text {
            line.push_str(&format!(" ({text})"));
        }
        line
    });
    console.chain(network).collect()
}

fn analysis_from_object(
    map: &Map<String, Value>,
    step_description: &str,
    error_message: Option<&str>,
    observed: &ObservedState,
) -> Result<FailureAnalysis, FallbackReason> {
    let raw_class = string_field(map, "rootCauseClass")
        .ok_or_else(|| FallbackReason::Invalid("missing rootCauseClass".into()))?;
    let root_cause_class = RootCause::from_label(&raw_class)
        .ok_or_else(|| FallbackReason::Invalid(format!("unknown rootCauseClass '{raw_class}'")))?;

    let confidence = map
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE);

    let mut detailed_analysis = string_list_field(map, "detailedAnalysis");
    if detailed_analysis.is_empty() {
        detailed_analysis = base_details(step_description, observed);
    }
    let mut suggested_next_actions = string_list_field(map, "suggestedNextActions");
    if suggested_next_actions.is_empty() {
        suggested_next_actions = root_cause_class.suggested_next_actions();
    }

    Ok(FailureAnalysis {
        root_cause_class,
        confidence,
        short_reason: string_field(map, "shortReason")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| error_message.unwrap_or("Unknown failure").to_string()),
        detailed_analysis,
        suggested_next_actions,
    })
}

fn base_details(step_description: &str, observed: &ObservedState) -> Vec<String> {
    vec![
        format!("Step: {step_description}"),
        format!("URL: {}", observed.url),
    ]
}

/// "Locator/UI change" when the error mentions a locator, otherwise "Timing/Flakiness".
pub fn heuristic_analysis(
    step_description: &str,
    error_message: Option<&str>,
    observed: &ObservedState,
) -> FailureAnalysis {
    let reason = error_message.unwrap_or("Unknown failure");
    let root_cause_class = if reason.to_lowercase().contains("locator") {
        RootCause::LocatorUiChange
    } else {
        RootCause::TimingFlakiness
    };
    let mut detailed_analysis = base_details(step_description, observed);
    detailed_analysis.extend(evidence_lines(observed));

    FailureAnalysis {
        root_cause_class,
        confidence: HEURISTIC_CONFIDENCE,
        short_reason: reason.to_string(),
        detailed_analysis,
        suggested_next_actions: root_cause_class.suggested_next_actions(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ConsoleLevel, ConsoleLogEntry, NetworkEvent};
    use crate::testing::ScriptedReasoner;

    fn noisy_state() -> ObservedState {
        let mut state = ObservedState::blank("https://app.test/orders", "Orders");
        state.console_logs = vec![
            ConsoleLogEntry {
                level: ConsoleLevel::Warn,
                message: "deprecated API".into(),
                timestamp: chrono::Utc::now(),
            },
            ConsoleLogEntry {
                level: ConsoleLevel::Error,
                message: "TypeError: x is undefined".into(),
                timestamp: chrono::Utc::now(),
            },
        ];
        state.network_events = vec![
            NetworkEvent {
                url: "https://api.test/orders".into(),
                method: "GET".into(),
                status: 500,
                timestamp: chrono::Utc::now(),
                error_text: Some("Internal Server Error".into()),
            },
            NetworkEvent {
                url: "https://api.test/me".into(),
                method: "GET".into(),
                status: 200,
                timestamp: chrono::Utc::now(),
                error_text: None,
            },
        ];
        state
    }

    async fn analyze_with(reply: Result<&str, &str>, error: Option<&str>) -> (FailureAnalysis, Arc<ScriptedReasoner>) {
        let reasoner = Arc::new(ScriptedReasoner::replying(reply));
        let analyzer = FailureAnalyzer::new(reasoner.clone());
        let analysis = analyzer.analyze("Click Save", error, &noisy_state()).await;
        (analysis, reasoner)
    }

    #[tokio::test]
    async fn locator_errors_fall_back_to_locator_class() {
        let (analysis, _) = analyze_with(Err("timeout"), Some("element not found (locator)")).await;
        assert_eq!(analysis.root_cause_class, RootCause::LocatorUiChange);
        assert_eq!(analysis.confidence, HEURISTIC_CONFIDENCE);
        assert_eq!(analysis.short_reason, "element not found (locator)");
    }

    #[tokio::test]
    async fn other_errors_fall_back_to_timing() {
        let (analysis, _) = analyze_with(Ok("no idea"), Some("Timed out after 10s")).await;
        assert_eq!(analysis.root_cause_class, RootCause::TimingFlakiness);
        assert_eq!(analysis.confidence, 0.35);

        let (analysis, _) = analyze_with(Ok("no idea"), None).await;
        assert_eq!(analysis.short_reason, "Unknown failure");
    }

    #[tokio::test]
    async fn heuristic_details_include_error_evidence() {
        let (analysis, _) = analyze_with(Err("down"), Some("LOCATOR text=Save missing")).await;
        assert_eq!(analysis.root_cause_class, RootCause::LocatorUiChange);
        assert!(analysis.detailed_analysis.contains(&"URL: https://app.test/orders".to_string()));
        assert!(analysis
            .detailed_analysis
            .iter()
            .any(|l| l.contains("500") && l.contains("Internal Server Error")));
        assert!(!analysis.detailed_analysis.iter().any(|l| l.contains("/me")));
    }

    #[tokio::test]
    async fn model_classification_is_validated_and_clamped() {
        let reply = r#"```json
{"rootCauseClass": "environment/backend", "confidence": 1.7, "shortReason": "Orders API returned 500"}
```"#;
        let (analysis, _) = analyze_with(Ok(reply), Some("element not found (locator)")).await;
        assert_eq!(analysis.root_cause_class, RootCause::EnvironmentBackend);
        assert_eq!(analysis.confidence, 1.0);
        assert_eq!(analysis.short_reason, "Orders API returned 500");
        assert_eq!(analysis.detailed_analysis[0], "Step: Click Save");
        assert!(!analysis.suggested_next_actions.is_empty());
    }

    #[tokio::test]
    async fn unknown_class_triggers_fallback() {
        let reply = r#"{"rootCauseClass": "Cosmic rays", "confidence": 0.9}"#;
        let (analysis, _) = analyze_with(Ok(reply), Some("element not found (locator)")).await;
        assert_eq!(analysis.root_cause_class, RootCause::LocatorUiChange);
        assert_eq!(analysis.confidence, HEURISTIC_CONFIDENCE);
    }

    #[tokio::test]
    async fn prompt_lists_only_error_evidence() {
        let (_, reasoner) = analyze_with(Ok("{}"), Some("boom")).await;
        let prompt = reasoner.prompts().pop().unwrap();
        assert!(prompt.contains("Console error: TypeError: x is undefined"));
        assert!(!prompt.contains("deprecated API"));
        assert!(prompt.contains("Network error: GET https://api.test/orders -> 500"));
        assert!(prompt.contains("Error: boom"));
        assert!(prompt.contains("Blocking UI"));
    }

    #[test]
    fn root_cause_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&RootCause::PermissionsAuth).unwrap(),
            "\"Permissions/Auth\""
        );
        assert_eq!(RootCause::from_label(" blocking ui "), Some(RootCause::BlockingUi));
    }
}
