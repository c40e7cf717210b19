use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Select,
    Assert,
    Noop,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Select => "select",
            ActionKind::Assert => "assert",
            ActionKind::Noop => "noop",
        }
    }

    /// Case-insensitive lookup; `no-op` is accepted as an alias of `noop`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(ActionKind::Navigate),
            "click" => Some(ActionKind::Click),
            "type" => Some(ActionKind::Type),
            "select" => Some(ActionKind::Select),
            "assert" => Some(ActionKind::Assert),
            "noop" | "no-op" => Some(ActionKind::Noop),
            _ => None,
        }
    }

    /// Click, type, select and assert resolve an element through locators.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, ActionKind::Navigate | ActionKind::Noop)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLogEntry {
    pub level: ConsoleLevel,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEvent {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl NetworkEvent {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Point-in-time snapshot of the page as seen by the automation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedState {
    pub url: String,
    pub title: String,
    pub dom_snapshot: String,
    pub aria_snapshot: String,
    pub visible_text: Vec<String>,
    pub console_logs: Vec<ConsoleLogEntry>,
    pub network_events: Vec<NetworkEvent>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ObservedState {
    /// A blank page with nothing observed yet.
    pub fn blank(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            dom_snapshot: "<html></html>".into(),
            aria_snapshot: "{}".into(),
            visible_text: Vec::new(),
            console_logs: Vec::new(),
            network_events: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn console_errors(&self) -> impl Iterator<Item = &ConsoleLogEntry> {
        self.console_logs
            .iter()
            .filter(|entry| entry.level == ConsoleLevel::Error)
    }

    pub fn network_errors(&self) -> impl Iterator<Item = &NetworkEvent> {
        self.network_events.iter().filter(|event| event.is_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// `strategy=value` for element actions; empty for navigation.
    pub locator: String,
    pub kind: ActionKind,
    pub value: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}
