use crate::config::OllamaSettings;
use crate::llm::sanitize::sanitize_sql;
use crate::llm::{LlmError, OLLAMA_SETUP_HINT, ProviderKind, SqlGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Local model served by Ollama.
///
/// The instructional prompt and schema live in the model's Modelfile, so only
/// the user's question is sent per request.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    probe_timeout: Duration,
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize, Debug)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize, Debug)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize, Debug)]
struct ModelTag {
    #[serde(default)]
    name: String,
}

impl OllamaProvider {
    pub fn new(settings: &OllamaSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::ProviderUnavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            probe_timeout: Duration::from_secs(settings.probe_timeout_secs),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }

    /// Checks that Ollama answers and that the configured model is installed.
    ///
    /// Any failure counts as "not available"; the caller moves on to the next backend.
    pub async fn is_available(&self) -> bool {
        let response = match self
            .client
            .get(self.tags_url())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Ollama probe failed to connect: {}", e);
                return false;
            }
        };

        if !response.status().is_success() {
            debug!("Ollama probe returned status {}", response.status());
            return false;
        }

        let tags: TagsResponse = match response.json().await {
            Ok(tags) => tags,
            Err(e) => {
                debug!("Ollama probe returned an unreadable model list: {}", e);
                return false;
            }
        };

        let wanted = base_model_name(&self.model);
        let installed = tags.models.iter().any(|m| base_model_name(&m.name) == wanted);
        if !installed {
            info!("Ollama is running but model '{}' is not installed", self.model);
        }
        installed
    }
}

/// Model name without its `:tag` suffix.
fn base_model_name(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

#[async_trait]
impl SqlGenerator for OllamaProvider {
    async fn generate_sql(&self, question: &str, _schema: &str) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);

        let request = GenerateRequest {
            model: &self.model,
            prompt: question,
            stream: false,
            options: SamplingOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    LlmError::ProviderUnavailable(format!(
                        "cannot reach Ollama at {} ({}).\n{}",
                        self.base_url, e, OLLAMA_SETUP_HINT
                    ))
                } else {
                    LlmError::ProviderUnavailable(format!(
                        "Ollama request to {} failed ({}).\n{}",
                        self.base_url, e, OLLAMA_SETUP_HINT
                    ))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::GenerationFailure(format!("failed to read Ollama response: {}", e)))?;

        if !status.is_success() {
            error!("Ollama API responded with status code: {} - {}", status, body);
            return Err(LlmError::GenerationFailure(format!(
                "Ollama API error: {} - {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::GenerationFailure(format!("failed to parse Ollama response: {}", e))
        })?;

        debug!("Raw response from Ollama: {}", parsed.response);
        let sql = sanitize_sql(&parsed.response);

        if sql.is_empty() {
            warn!("Ollama returned no SQL for question: {}", question);
            return Err(LlmError::GenerationFailure(
                "Ollama response contained no SQL".to_string(),
            ));
        }

        debug!("Sanitized SQL: {}", sql);
        Ok(sql)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Serves `router` on an ephemeral port and returns its base URL.
    pub(crate) async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A base URL nothing listens on.
    pub(crate) async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    pub(crate) fn tags_router(names: &'static [&'static str]) -> Router {
        Router::new().route(
            "/api/tags",
            get(move || async move {
                let models: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
                Json(json!({ "models": models }))
            }),
        )
    }

    fn settings(base_url: &str) -> OllamaSettings {
        let mut settings = LlmConfig::default().ollama;
        settings.base_url = base_url.to_string();
        settings.timeout_secs = 5;
        settings.probe_timeout_secs = 2;
        settings
    }

    #[test]
    fn test_base_model_name() {
        assert_eq!(base_model_name("sql-analyst:latest"), "sql-analyst");
        assert_eq!(base_model_name("sql-analyst"), "sql-analyst");
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let provider = OllamaProvider::new(&settings("http://localhost:11434/")).unwrap();
        assert_eq!(provider.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(provider.tags_url(), "http://localhost:11434/api/tags");
    }

    #[tokio::test]
    async fn test_probe_finds_tagged_model() {
        let url = spawn_backend(tags_router(&["llama3:8b", "sql-analyst:latest"])).await;
        let provider = OllamaProvider::new(&settings(&url)).unwrap();
        assert!(provider.is_available().await);
    }

    #[tokio::test]
    async fn test_probe_fails_without_model() {
        let url = spawn_backend(tags_router(&["llama3:8b"])).await;
        let provider = OllamaProvider::new(&settings(&url)).unwrap();
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn test_probe_fails_when_offline() {
        let provider = OllamaProvider::new(&settings(&dead_url().await)).unwrap();
        assert!(!provider.is_available().await);
    }

    #[tokio::test]
    async fn test_generate_sends_question_verbatim_and_sanitizes() {
        let seen = Arc::new(Mutex::new(None::<Value>));
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/api/generate",
            post(move |Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    *captured.lock().unwrap() = Some(body);
                    Json(json!({ "response": "```sql\nSELECT COUNT(*) FROM taxi_trips\n```", "done": true }))
                }
            }),
        );
        let url = spawn_backend(router).await;
        let provider = OllamaProvider::new(&settings(&url)).unwrap();

        let sql = provider
            .generate_sql("how many trips?", "Table: taxi_trips")
            .await
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM taxi_trips");

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["prompt"], "how many trips?");
        assert_eq!(body["model"], "sql-analyst");
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::NOT_FOUND, "model 'sql-analyst' not found") }),
        );
        let url = spawn_backend(router).await;
        let provider = OllamaProvider::new(&settings(&url)).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::GenerationFailure(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_generate_empty_response() {
        let router = Router::new().route(
            "/api/generate",
            post(|| async { Json(json!({ "response": "```sql\n```" })) }),
        );
        let url = spawn_backend(router).await;
        let provider = OllamaProvider::new(&settings(&url)).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::GenerationFailure(_)));
    }

    #[tokio::test]
    async fn test_generate_offline_has_remediation() {
        let provider = OllamaProvider::new(&settings(&dead_url().await)).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("ollama serve"));
    }

    #[tokio::test]
    async fn test_generate_bad_base_url_has_remediation() {
        let provider = OllamaProvider::new(&settings("not a url")).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("ollama serve"));
    }
}
