use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{QaError, QaResult};
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Unified chat-completion provider. New providers implement this trait and
/// register under `[reasoning.providers]`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Matches the config key.
    fn name(&self) -> &str;

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> QaResult<LlmResponse>;
}

/// What the planner and failure analyzer consume: one prompt in, free text out.
/// No schema is enforced here; callers validate the text themselves.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> QaResult<String>;
}

/// A provider bound to the call settings of one role.
pub struct RoleBackend {
    provider: Arc<dyn LlmProvider>,
    cfg: CallConfig,
}

impl RoleBackend {
    pub fn new(provider: Arc<dyn LlmProvider>, cfg: CallConfig) -> Self {
        Self { provider, cfg }
    }
}

#[async_trait]
impl ReasoningBackend for RoleBackend {
    async fn complete(&self, prompt: &str) -> QaResult<String> {
        let response = self
            .provider
            .chat(vec![ChatMessage::user(prompt)], &self.cfg)
            .await?;
        Ok(response.content.trim().to_string())
    }
}

/// Stand-in used when no provider is configured. Every call is a configuration
/// error, which callers turn into their deterministic fallback.
pub struct UnconfiguredBackend {
    role: String,
}

impl UnconfiguredBackend {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

#[async_trait]
impl ReasoningBackend for UnconfiguredBackend {
    async fn complete(&self, _prompt: &str) -> QaResult<String> {
        Err(QaError::Config(format!(
            "no reasoning provider configured for role '{}'",
            self.role
        )))
    }
}
