use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ReasoningConfig, RoleEntry};
use crate::errors::{QaError, QaResult};
use crate::llm::provider::{LlmProvider, ReasoningBackend, RoleBackend, UnconfiguredBackend};
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// The two places the reasoning backend is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Planning,
    Analysis,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Planning => "planning",
            Role::Analysis => "analysis",
        }
    }
}

/// Registry of all configured providers, keyed by their `[reasoning.providers]` id.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    config: ReasoningConfig,
}

impl ProviderRegistry {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            providers: HashMap::new(),
            config,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build a registry from the loaded config.
    /// API keys are read from `QA_PILOT_<ID>_API_KEY`, then from the config entry.
    pub fn from_config(config: &ReasoningConfig) -> Self {
        let mut registry = Self::new(config.clone());
        for (id, entry) in &config.providers {
            let api_key = config.api_key_for(id).unwrap_or_default();
            let provider = OpenAiCompatibleProvider::new(id.clone(), entry.api_base.clone(), api_key);
            registry.register(Arc::new(provider));
        }
        registry
    }

    /// Resolve the provider and call settings for a role.
    ///
    /// Resolution order:
    /// 1. `[reasoning.roles.<role>]`
    /// 2. the active provider with its default model and temperature, non-streaming
    pub fn call_config_for_role(&self, role: Role) -> QaResult<(Arc<dyn LlmProvider>, CallConfig)> {
        let role_entry: Option<&RoleEntry> = match role {
            Role::Planning => self.config.roles.planning.as_ref(),
            Role::Analysis => self.config.roles.analysis.as_ref(),
        };

        if let Some(entry) = role_entry {
            let provider = self.providers.get(&entry.provider).cloned().ok_or_else(|| {
                QaError::Config(format!(
                    "role '{}' references unknown provider '{}'",
                    role.as_str(),
                    entry.provider
                ))
            })?;
            let defaults = self.config.providers.get(&entry.provider);
            let temperature = entry
                .temperature
                .or_else(|| defaults.map(|p| p.temperature))
                .unwrap_or(0.2);
            let max_tokens = defaults.map(|p| p.max_tokens).unwrap_or(512);
            tracing::debug!(
                role = role.as_str(),
                provider = %entry.provider,
                model = %entry.model,
                stream = entry.stream,
                temperature,
                "resolved role config"
            );
            return Ok((
                provider,
                CallConfig {
                    model: entry.model.clone(),
                    stream: entry.stream,
                    temperature,
                    max_tokens,
                },
            ));
        }

        let active = &self.config.active_provider;
        let provider = self.providers.get(active).cloned().ok_or_else(|| {
            QaError::Config(format!("active provider '{active}' not found in registry"))
        })?;
        let entry = self.config.providers.get(active);
        tracing::debug!(
            role = role.as_str(),
            provider = %active,
            "role not configured, using active provider"
        );
        Ok((
            provider,
            CallConfig {
                model: entry.map(|p| p.model.clone()).unwrap_or_default(),
                stream: false,
                temperature: entry.map(|p| p.temperature).unwrap_or(0.2),
                max_tokens: entry.map(|p| p.max_tokens).unwrap_or(512),
            },
        ))
    }

    /// The backend a role should talk to. With no providers at all this is an
    /// [`UnconfiguredBackend`], so the agent still runs on its fallbacks.
    pub fn backend_for_role(&self, role: Role) -> QaResult<Arc<dyn ReasoningBackend>> {
        if self.is_empty() {
            tracing::warn!(role = role.as_str(), "no reasoning provider configured; using heuristics only");
            return Ok(Arc::new(UnconfiguredBackend::new(role.as_str())));
        }
        let (provider, cfg) = self.call_config_for_role(role)?;
        Ok(Arc::new(RoleBackend::new(provider, cfg)))
    }
}
