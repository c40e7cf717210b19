use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Test definition parse error: {0}")]
    Parse(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    #[error("Automation backend error: {0}")]
    Backend(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl QaError {
    /// Missing credentials or settings, as opposed to a transport or payload failure.
    pub fn is_config(&self) -> bool {
        matches!(self, QaError::Config(_))
    }
}

pub type QaResult<T> = Result<T, QaError>;
