//! Selection of the active SQL generation backend.
//!
//! Order of preference: an explicit override, then a local Ollama model that
//! passes its availability probe, then the remote OpenAI API. The result is
//! cached for the lifetime of the resolver until [`ProviderResolver::reset`].

use crate::config::LlmConfig;
use crate::llm::providers::ollama::OllamaProvider;
use crate::llm::providers::remote::RemoteLlmProvider;
use crate::llm::{LlmError, OLLAMA_SETUP_HINT, OPENAI_SETUP_HINT, ProviderKind, SqlGenerator};
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type ProviderCell = Arc<OnceCell<Arc<dyn SqlGenerator>>>;

pub struct ProviderResolver {
    config: LlmConfig,
    // Swapped wholesale on reset; resolution itself happens inside the cell.
    cell: RwLock<ProviderCell>,
}

impl ProviderResolver {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            cell: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// A resolver that starts out resolved to `provider`.
    #[cfg(test)]
    pub fn with_provider(config: LlmConfig, provider: Arc<dyn SqlGenerator>) -> Self {
        Self {
            config,
            cell: RwLock::new(Arc::new(OnceCell::new_with(Some(provider)))),
        }
    }

    /// Returns the active provider, resolving it on first call.
    ///
    /// Concurrent first callers wait on the same initialization and all
    /// receive the same instance. A failed resolution is not cached.
    pub async fn provider(&self) -> Result<Arc<dyn SqlGenerator>, LlmError> {
        let cell = self.current_cell();
        cell.get_or_try_init(|| self.resolve()).await.cloned()
    }

    /// The resolved provider, if any, without resolving.
    pub fn current(&self) -> Option<Arc<dyn SqlGenerator>> {
        self.current_cell().get().cloned()
    }

    /// Forgets the resolved provider; the next call to `provider` resolves again.
    pub fn reset(&self) {
        let mut cell = self.cell.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *cell = Arc::new(OnceCell::new());
        debug!("LLM provider selection reset");
    }

    fn current_cell(&self) -> ProviderCell {
        let cell = self.cell.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&cell)
    }

    async fn resolve(&self) -> Result<Arc<dyn SqlGenerator>, LlmError> {
        match ProviderKind::parse_override(self.config.provider.as_deref())? {
            Some(kind) => self.build_explicit(kind),
            None => self.auto_detect().await,
        }
    }

    /// Builds the requested backend; failure is final.
    fn build_explicit(&self, kind: ProviderKind) -> Result<Arc<dyn SqlGenerator>, LlmError> {
        info!("Using LLM provider '{}' (explicitly configured)", kind);

        let provider: Result<Arc<dyn SqlGenerator>, LlmError> = match kind {
            ProviderKind::Local => OllamaProvider::new(&self.config.ollama)
                .map(|p| Arc::new(p) as Arc<dyn SqlGenerator>),
            ProviderKind::Remote => RemoteLlmProvider::new(&self.config.openai)
                .map(|p| Arc::new(p) as Arc<dyn SqlGenerator>),
        };

        provider.map_err(|e| {
            LlmError::NoProviderAvailable(format!(
                "provider '{}' was requested but could not be set up: {}",
                kind, e
            ))
        })
    }

    async fn auto_detect(&self) -> Result<Arc<dyn SqlGenerator>, LlmError> {
        match OllamaProvider::new(&self.config.ollama) {
            Ok(ollama) => {
                if ollama.is_available().await {
                    info!("Using Ollama (local model '{}')", self.config.ollama.model);
                    return Ok(Arc::new(ollama));
                }
                debug!("Ollama not available at {}", self.config.ollama.base_url);
            }
            Err(e) => debug!("Skipping Ollama: {}", e),
        }

        match RemoteLlmProvider::new(&self.config.openai) {
            Ok(remote) => {
                info!("Using OpenAI API (model '{}')", self.config.openai.model);
                return Ok(Arc::new(remote));
            }
            Err(e) => debug!("Skipping OpenAI: {}", e),
        }

        warn!("No LLM provider could be resolved");
        Err(LlmError::NoProviderAvailable(format!(
            "\n\nOption 1 (Recommended): {}\n\nOption 2: {}",
            OLLAMA_SETUP_HINT, OPENAI_SETUP_HINT
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::ollama::tests::{dead_url, spawn_backend};
    use axum::{Json, Router, routing::get};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake Ollama listing `sql-analyst` that counts probe hits.
    async fn counting_ollama() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/api/tags",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "models": [{ "name": "sql-analyst:latest" }] }))
                }
            }),
        );
        (spawn_backend(router).await, hits)
    }

    fn config(ollama_url: &str, api_key: Option<&str>, provider: Option<&str>) -> LlmConfig {
        let mut config = LlmConfig::default();
        config.ollama.base_url = ollama_url.to_string();
        config.ollama.probe_timeout_secs = 2;
        config.openai.api_key = api_key.map(str::to_string);
        config.provider = provider.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn test_prefers_local_when_probe_passes() {
        let (url, hits) = counting_ollama().await;
        let resolver = ProviderResolver::new(config(&url, Some("sk-test"), None));

        let provider = resolver.provider().await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_remote() {
        let resolver = ProviderResolver::new(config(&dead_url().await, Some("sk-test"), None));

        let provider = resolver.provider().await.unwrap();
        assert_eq!(provider.kind(), ProviderKind::Remote);
    }

    #[tokio::test]
    async fn test_falls_back_when_model_missing() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async { Json(json!({ "models": [{ "name": "llama3:8b" }] })) }),
        );
        let url = spawn_backend(router).await;
        let resolver = ProviderResolver::new(config(&url, Some("sk-test"), None));

        assert_eq!(resolver.provider().await.unwrap().kind(), ProviderKind::Remote);
    }

    #[tokio::test]
    async fn test_exhaustion_carries_both_remedies() {
        let resolver = ProviderResolver::new(config(&dead_url().await, None, None));

        let err = resolver.provider().await.err().unwrap();
        assert!(matches!(err, LlmError::NoProviderAvailable(_)));
        let msg = err.to_string();
        assert!(msg.contains("ollama serve"));
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(resolver.current().is_none());
    }

    #[tokio::test]
    async fn test_remote_override_without_key_never_probes() {
        let (url, hits) = counting_ollama().await;
        let resolver = ProviderResolver::new(config(&url, None, Some("remote")));

        let err = resolver.provider().await.err().unwrap();
        assert!(matches!(err, LlmError::NoProviderAvailable(_)));
        assert!(err.to_string().contains("API key"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_override_skips_probe() {
        let (url, hits) = counting_ollama().await;
        let resolver = ProviderResolver::new(config(&url, Some("sk-test"), Some("LOCAL")));

        assert_eq!(resolver.provider().await.unwrap().kind(), ProviderKind::Local);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_resolves_once() {
        let (url, hits) = counting_ollama().await;
        let resolver = Arc::new(ProviderResolver::new(config(&url, None, None)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.provider().await.unwrap() })
            })
            .collect();

        let mut providers = Vec::new();
        for handle in handles {
            providers.push(handle.await.unwrap());
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(providers.iter().all(|p| Arc::ptr_eq(p, &providers[0])));
    }

    #[tokio::test]
    async fn test_reset_resolves_again() {
        let (url, hits) = counting_ollama().await;
        let resolver = ProviderResolver::new(config(&url, None, None));

        let first = resolver.provider().await.unwrap();
        let cached = resolver.provider().await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        resolver.reset();
        assert!(resolver.current().is_none());

        let second = resolver.provider().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
