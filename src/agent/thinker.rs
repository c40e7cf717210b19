use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::agent::types::{ExecutionPlanStep, PlannedAction};
use crate::browser::{ActionKind, ObservedState};
use crate::llm::response::{string_field, string_list_field};
use crate::llm::{salvage_object, FallbackReason, ReasoningBackend, Salvaged};
use crate::locators::LocatorStrategy;

/// How many visible-text fragments go into a prompt.
pub const VISIBLE_TEXT_SAMPLE: usize = 20;

const RECOGNIZED_FIELDS: [&str; 5] = [
    "actionType",
    "targetDescription",
    "candidateLocators",
    "expectedOutcome",
    "inputValue",
];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+").expect("url pattern is valid"));

pub struct ThinkContext<'a> {
    pub step: &'a ExecutionPlanStep,
    pub observed: &'a ObservedState,
    pub previous_actions: &'a [String],
}

/// A plan either came from the model or from the deterministic fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum ThinkOutcome {
    Planned(PlannedAction),
    Fallback {
        action: PlannedAction,
        reason: FallbackReason,
    },
}

impl ThinkOutcome {
    pub fn action(&self) -> &PlannedAction {
        match self {
            ThinkOutcome::Planned(action) | ThinkOutcome::Fallback { action, .. } => action,
        }
    }

    pub fn into_action(self) -> PlannedAction {
        match self {
            ThinkOutcome::Planned(action) | ThinkOutcome::Fallback { action, .. } => action,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ThinkOutcome::Fallback { .. })
    }
}

/// Decides the next action for a step by consulting the reasoning backend,
/// falling back to a heuristic plan whenever the backend cannot help.
pub struct Thinker {
    backend: Arc<dyn ReasoningBackend>,
    strategy: LocatorStrategy,
}

impl Thinker {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            backend,
            strategy: LocatorStrategy::new(),
        }
    }

    /// Never fails: every backend or parsing problem becomes [`ThinkOutcome::Fallback`].
    pub async fn plan(&self, ctx: ThinkContext<'_>) -> ThinkOutcome {
        let step = ctx.step;
        let prompt = build_prompt(&ctx);

        let reason = match self.backend.complete(&prompt).await {
            Ok(raw) => match salvage_object(&raw) {
                Salvaged::Recovered(map) => match action_from_object(&map, step) {
                    Ok(action) => {
                        tracing::debug!(step = %step.id, action = %action.action_type, "model plan accepted");
                        return ThinkOutcome::Planned(action);
                    }
                    Err(reason) => reason,
                },
                Salvaged::Unrecoverable => FallbackReason::Unparseable,
            },
            Err(e) => FallbackReason::Backend(e.to_string()),
        };

        tracing::warn!(step = %step.id, %reason, "falling back to heuristic plan");
        ThinkOutcome::Fallback {
            action: self.fallback_action(step),
            reason,
        }
    }

    /// Navigate to the first URL in a "navigate…" step, otherwise click the strategy's candidates.
    pub fn fallback_action(&self, step: &ExecutionPlanStep) -> PlannedAction {
        if step.description.to_lowercase().starts_with("navigate") {
            return PlannedAction {
                action_type: ActionKind::Navigate,
                target_description: step.description.clone(),
                candidate_locators: Vec::new(),
                expected_outcome: step.expected_outcome.clone(),
                input_value: extract_url(&step.description),
            };
        }

        PlannedAction {
            action_type: ActionKind::Click,
            target_description: step.description.clone(),
            candidate_locators: self
                .strategy
                .build_candidate_locators(step)
                .iter()
                .map(|c| c.to_token())
                .collect(),
            expected_outcome: step.expected_outcome.clone(),
            input_value: None,
        }
    }
}

pub fn build_prompt(ctx: &ThinkContext<'_>) -> String {
    let ThinkContext {
        step,
        observed,
        previous_actions,
    } = ctx;
    let visible_text = observed
        .visible_text
        .iter()
        .take(VISIBLE_TEXT_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" | ");
    let history = if previous_actions.is_empty() {
        "none".to_string()
    } else {
        previous_actions.join(" -> ")
    };

    [
        "You are the reasoning brain of an agentic web testing framework.".to_string(),
        "Given the current step, observed page context, and previous actions, respond with a JSON object describing the next action.".to_string(),
        r#"The JSON schema is {"actionType": "navigate|click|type|select|assert|noop", "targetDescription": string, "candidateLocators": string[], "expectedOutcome": string, "inputValue": string}."#.to_string(),
        "Candidate locators are strategy:value tokens such as text:Sign in or css:#submit.".to_string(),
        format!("Step ID: {}", step.id),
        format!("Step Label: {}", step.label),
        format!("Step Description: {}", step.description),
        format!("Expected Outcome: {}", step.expected_outcome.as_deref().unwrap_or("N/A")),
        format!("Possible Locators: {}", step.possible_locators.join(", ")),
        format!("Assertion Hooks: {}", step.assertion_hooks.join(", ")),
        format!("Current URL: {}", observed.url),
        format!("Page Title: {}", observed.title),
        format!("Visible Text Sample: {visible_text}"),
        format!("Previous Actions: {history}"),
        "Return JSON only with no additional commentary.".to_string(),
    ]
    .join("\n")
}

/// Validate a recovered object field by field, defaulting from the step.
fn action_from_object(
    map: &Map<String, Value>,
    step: &ExecutionPlanStep,
) -> Result<PlannedAction, FallbackReason> {
    if !RECOGNIZED_FIELDS.iter().any(|f| map.contains_key(*f)) {
        return Err(FallbackReason::Invalid("no recognizable fields".into()));
    }

    let action_type = match string_field(map, "actionType") {
        Some(raw) => ActionKind::parse(&raw).unwrap_or_else(|| {
            tracing::debug!(action = %raw, "unknown actionType, defaulting to click");
            ActionKind::Click
        }),
        None => ActionKind::Click,
    };

    Ok(PlannedAction {
        action_type,
        target_description: string_field(map, "targetDescription")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| step.description.clone()),
        candidate_locators: string_list_field(map, "candidateLocators"),
        expected_outcome: string_field(map, "expectedOutcome")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| step.expected_outcome.clone()),
        input_value: string_field(map, "inputValue"),
    })
}

/// First http(s) URL in the text, without trailing `)`, `,` or `.`.
fn extract_url(description: &str) -> Option<String> {
    let found = URL_PATTERN.find(description)?;
    let url = found.as_str().trim_end_matches([')', ',', '.']);
    (!url.is_empty()).then(|| url.to_string())
}
