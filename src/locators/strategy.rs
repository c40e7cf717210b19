use serde::{Deserialize, Serialize};

use crate::agent::types::ExecutionPlanStep;

/// One way to resolve a UI element: a strategy tag plus its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorCandidate {
    pub strategy: String,
    pub value: String,
}

impl LocatorCandidate {
    pub fn new(strategy: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            value: value.into(),
        }
    }

    /// Parse a `strategy:value` token. The value may itself contain colons.
    /// Tokens without a colon or with an empty strategy are rejected.
    pub fn from_token(token: &str) -> Option<Self> {
        let (strategy, value) = token.split_once(':')?;
        if strategy.is_empty() {
            return None;
        }
        Some(Self::new(strategy, value))
    }

    /// `strategy:value`, the form exchanged with the reasoning backend.
    pub fn to_token(&self) -> String {
        format!("{}:{}", self.strategy, self.value)
    }

    /// `strategy=value`, the form handed to the automation backend.
    pub fn to_locator(&self) -> String {
        format!("{}={}", self.strategy, self.value)
    }
}

/// Deterministic, side-effect free candidate derivation from a step.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocatorStrategy;

impl LocatorStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Most specific first: exact text, role+label, normalized test id,
    /// then a contains-match on the first three words.
    pub fn build_candidate_locators(&self, step: &ExecutionPlanStep) -> Vec<LocatorCandidate> {
        let mut candidates = vec![
            LocatorCandidate::new("text", step.description.as_str()),
            LocatorCandidate::new("role+text", step.label.as_str()),
            LocatorCandidate::new("data-testid", normalize_identifier(&step.label)),
        ];

        let tokens: Vec<&str> = step.description.split_whitespace().take(3).collect();
        if !tokens.is_empty() {
            candidates.push(LocatorCandidate::new("text-contains", tokens.join(" ")));
        }

        candidates
    }
}

/// Lower-case the label and collapse each run of non-alphanumerics to `-`.
fn normalize_identifier(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut in_separator = false;
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        } else if !in_separator {
            out.push('-');
            in_separator = true;
        }
    }
    out
}
