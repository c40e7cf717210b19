use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{QaError, QaResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub base_url: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default = "default_max_self_heal_attempts")]
    pub max_self_heal_attempts: u32,
    #[serde(default = "default_true")]
    pub enable_self_healing: bool,
    #[serde(default)]
    pub enable_manual_login_pause: bool,
    #[serde(default = "default_true")]
    pub enable_failure_analysis: bool,
    #[serde(default)]
    pub capture_screenshots: ScreenshotPolicy,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_tests_dir")]
    pub tests_dir: PathBuf,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Dev,
    #[default]
    Qa,
    Prod,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        };
        f.write_str(name)
    }
}

/// Per-phase timeout hints. Honoring them is the automation backend's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_element_ms")]
    pub element_ms: u64,
    #[serde(default = "default_assertion_ms")]
    pub assertion_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            element_ms: default_element_ms(),
            assertion_ms: default_assertion_ms(),
        }
    }
}

impl TimeoutsConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn assertion(&self) -> Duration {
        Duration::from_millis(self.assertion_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotPolicy {
    #[default]
    OnFailure,
    OnStep,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider (used when no role config exists).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Falls back to env var QA_PILOT_<ID>_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Maps the two reasoning roles to provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Next-action planning for a step.
    pub planning: Option<RoleEntry>,
    /// Root-cause classification of a failed step.
    pub analysis: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [reasoning.providers.*].
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    /// Overrides the provider-level temperature for this role.
    pub temperature: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_max_self_heal_attempts() -> u32 {
    2
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("tests")
}

fn default_navigation_ms() -> u64 {
    30_000
}

fn default_element_ms() -> u64 {
    10_000
}

fn default_assertion_ms() -> u64 {
    5_000
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    512
}

impl AgentConfig {
    /// Minimal config for programmatic use: defaults everywhere, no reasoning provider.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            environment: Environment::default(),
            timeouts: TimeoutsConfig::default(),
            max_self_heal_attempts: default_max_self_heal_attempts(),
            enable_self_healing: true,
            enable_manual_login_pause: false,
            enable_failure_analysis: true,
            capture_screenshots: ScreenshotPolicy::default(),
            output_dir: default_output_dir(),
            tests_dir: default_tests_dir(),
            reasoning: ReasoningConfig::default(),
        }
    }

    /// Rejects settings that must abort the run before any step executes.
    pub fn validate(&self) -> QaResult<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(QaError::Config("base_url is required".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(QaError::Config(format!(
                "base_url must be an http(s) URL, got '{base}'"
            )));
        }

        let reasoning = &self.reasoning;
        if !reasoning.active_provider.is_empty()
            && !reasoning.providers.contains_key(&reasoning.active_provider)
        {
            return Err(QaError::Config(format!(
                "active provider '{}' is not defined under [reasoning.providers]",
                reasoning.active_provider
            )));
        }
        for (role, entry) in [
            ("planning", &reasoning.roles.planning),
            ("analysis", &reasoning.roles.analysis),
        ] {
            if let Some(entry) = entry {
                if !reasoning.providers.contains_key(&entry.provider) {
                    return Err(QaError::Config(format!(
                        "role '{role}' references unknown provider '{}'",
                        entry.provider
                    )));
                }
            }
        }

        for id in reasoning.providers_in_use() {
            if reasoning.api_key_for(id).is_none() {
                return Err(QaError::Config(format!(
                    "missing API key for provider '{id}' (set {} or api_key)",
                    api_key_env_var(id)
                )));
            }
        }
        Ok(())
    }
}

impl ReasoningConfig {
    /// `QA_PILOT_<ID>_API_KEY` first, then the entry's `api_key`. Blank keys count as missing.
    pub fn api_key_for(&self, id: &str) -> Option<String> {
        std::env::var(api_key_env_var(id))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.providers.get(id)?.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Providers the active provider or a role points at, without duplicates.
    pub fn providers_in_use(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let roles = [&self.roles.planning, &self.roles.analysis];
        let candidates = std::iter::once(self.active_provider.as_str())
            .chain(roles.into_iter().flatten().map(|r| r.provider.as_str()));
        for id in candidates {
            if !id.is_empty() && self.providers.contains_key(id) && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

pub fn api_key_env_var(id: &str) -> String {
    format!("QA_PILOT_{}_API_KEY", id.to_uppercase())
}

fn resolve_config_path() -> QaResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(QaError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

/// Load and validate the run configuration. `.json` paths are read as JSON, anything else as TOML.
pub fn load_config(explicit: Option<&Path>) -> QaResult<AgentConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => resolve_config_path()?,
    };
    let content = std::fs::read_to_string(&path).map_err(|e| {
        QaError::Config(format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = parse_config(&content, &path)?;
    config.validate()?;
    tracing::info!(
        path = %path.display(),
        environment = %config.environment,
        provider = %config.reasoning.active_provider,
        "config loaded"
    );
    Ok(config)
}

fn parse_config(content: &str, path: &Path) -> QaResult<AgentConfig> {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| QaError::Config(format!("invalid config {}: {e}", path.display())))
}
