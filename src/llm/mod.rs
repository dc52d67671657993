pub mod providers;
pub mod resolver;
pub mod sanitize;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use self::resolver::ProviderResolver;

pub const OLLAMA_SETUP_HINT: &str = "Start the local model backend:\n  \
    1. Install: curl -fsSL https://ollama.ai/install.sh | sh\n  \
    2. Start: ollama serve\n  \
    3. Create the model configured as llm.ollama.model (default: sql-analyst)";

pub const OPENAI_SETUP_HINT: &str = "Use the OpenAI API:\n  \
    1. Get an API key from https://platform.openai.com\n  \
    2. Add it to .env: OPENAI_API_KEY=sk-...";

#[derive(Debug)]
pub enum LlmError {
    /// The backend could not be reached (connection refused, timeout, DNS).
    ProviderUnavailable(String),
    /// The backend needs a credential that is missing or was rejected.
    ProviderAuthError(String),
    /// The backend answered, but not with usable SQL.
    GenerationFailure(String),
    /// Resolution ran out of strategies.
    NoProviderAvailable(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ProviderUnavailable(msg) => write!(f, "LLM provider unavailable: {}", msg),
            LlmError::ProviderAuthError(msg) => write!(f, "LLM authentication error: {}", msg),
            LlmError::GenerationFailure(msg) => write!(f, "SQL generation failed: {}", msg),
            LlmError::NoProviderAvailable(msg) => write!(f, "No LLM provider available: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// Backend variants the resolver knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    Remote,
}

impl ProviderKind {
    /// Parses a provider override. Blank means "no override".
    pub fn parse_override(value: Option<&str>) -> Result<Option<Self>, LlmError> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        match raw.to_ascii_lowercase().as_str() {
            "local" | "ollama" => Ok(Some(ProviderKind::Local)),
            "remote" | "openai" => Ok(Some(ProviderKind::Remote)),
            other => Err(LlmError::NoProviderAvailable(format!(
                "unknown LLM provider override '{}' (expected 'local' or 'remote')",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "ollama",
            ProviderKind::Remote => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Turns a natural-language question into a single sanitized SQL statement.
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError>;

    fn kind(&self) -> ProviderKind;
}

/// Process-wide entry point for SQL generation; resolves a backend on first use.
pub struct LlmManager {
    resolver: ProviderResolver,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Self {
        Self::with_resolver(ProviderResolver::new(config.clone()))
    }

    pub fn with_resolver(resolver: ProviderResolver) -> Self {
        Self { resolver }
    }

    pub async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let generator = self.resolver.provider().await?;
        generator.generate_sql(question, schema).await
    }

    /// The provider selected so far, without triggering resolution.
    pub fn active_provider(&self) -> Option<Arc<dyn SqlGenerator>> {
        self.resolver.current()
    }

    pub fn reset(&self) {
        self.resolver.reset();
    }
}
