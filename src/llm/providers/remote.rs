use crate::config::OpenAiSettings;
use crate::llm::sanitize::sanitize_sql;
use crate::llm::{LlmError, OPENAI_SETUP_HINT, ProviderKind, SqlGenerator};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Placeholder shipped in the sample `.env`; treated as no key at all.
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

/// OpenAI-compatible chat-completions backend.
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct PromptResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl RemoteLlmProvider {
    pub fn new(settings: &OpenAiSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
            .ok_or_else(|| {
                LlmError::ProviderAuthError(format!("OpenAI API key not configured.\n{}", OPENAI_SETUP_HINT))
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::ProviderUnavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    fn prepare_prompt(&self, schema: &str) -> String {
        format!(
            r#"You are an expert SQL query generator for DuckDB.
Convert natural language requests into valid SQL queries.

{}

Rules:
1. Return ONLY the SQL query, no explanations
2. Always use proper DuckDB SQL syntax
3. Limit results to 1000 rows unless specifically asked for more
4. Use appropriate aggregations for summary queries
5. For time-based trends, extract month/year from timestamps
6. Always include ORDER BY for meaningful sorting
7. Use aliases for calculated columns
8. For revenue, use total_amount column
9. Handle NULL values appropriately"#,
            schema
        )
    }
}

#[async_trait]
impl SqlGenerator for RemoteLlmProvider {
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let system_prompt = self.prepare_prompt(schema);

        info!("Sending request to OpenAI with model: {}", self.model);

        let request = PromptRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &system_prompt,
                },
                Message {
                    role: "user",
                    content: question,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let cause = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                LlmError::ProviderUnavailable(format!(
                    "cannot reach OpenAI API at {} ({}). Check the base URL and network access.\n{}",
                    self.api_url, cause, OPENAI_SETUP_HINT
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::ProviderAuthError(format!(
                "OpenAI rejected the API key ({}).\n{}",
                status, OPENAI_SETUP_HINT
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API responded with status code: {} - {}", status, body);
            return Err(LlmError::GenerationFailure(format!(
                "OpenAI API error: {} - {}",
                status, body
            )));
        }

        let prompt_response: PromptResponse = response
            .json()
            .await
            .map_err(|e| LlmError::GenerationFailure(format!("failed to parse OpenAI response: {}", e)))?;

        let content = prompt_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::GenerationFailure("No choices in response".to_string()))?;

        debug!("Raw response from OpenAI: {}", content);
        let sql = sanitize_sql(&content);

        if sql.is_empty() {
            warn!("OpenAI returned no SQL for question: {}", question);
            return Err(LlmError::GenerationFailure(
                "OpenAI response contained no SQL".to_string(),
            ));
        }

        Ok(sql)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::llm::providers::ollama::tests::{dead_url, spawn_backend};
    use axum::{Json, Router, http::HeaderMap, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    fn settings(base_url: &str, api_key: Option<&str>) -> OpenAiSettings {
        let mut settings = LlmConfig::default().openai;
        settings.base_url = base_url.to_string();
        settings.api_key = api_key.map(str::to_string);
        settings
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        for key in [None, Some(""), Some("   "), Some(PLACEHOLDER_API_KEY)] {
            let result = RemoteLlmProvider::new(&settings("http://unused", key));
            assert!(
                matches!(result, Err(LlmError::ProviderAuthError(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_prompt_embeds_schema_and_rules() {
        let provider = RemoteLlmProvider::new(&settings("http://unused", Some("sk-test"))).unwrap();
        let prompt = provider.prepare_prompt("Table: taxi_trips");
        assert!(prompt.contains("Table: taxi_trips"));
        assert!(prompt.contains("1000 rows"));
        assert!(prompt.contains("ORDER BY"));
        assert!(prompt.contains("total_amount"));
        assert_eq!(provider.api_url, "http://unused/chat/completions");
    }

    #[tokio::test]
    async fn test_generate_sends_system_and_user_messages() {
        let seen = Arc::new(Mutex::new(None::<(Value, Option<String>)>));
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    *captured.lock().unwrap() = Some((body, auth));
                    Json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": "```sql\nSELECT 1\n```" } }]
                    }))
                }
            }),
        );
        let url = spawn_backend(router).await;
        let provider = RemoteLlmProvider::new(&settings(&url, Some("sk-test"))).unwrap();

        let sql = provider.generate_sql("top vendors", "Table: taxi_trips").await.unwrap();
        assert_eq!(sql, "SELECT 1");

        let (body, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"].as_str().unwrap().contains("Table: taxi_trips"));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "top vendors");
    }

    #[tokio::test]
    async fn test_rejected_key_is_auth_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let url = spawn_backend(router).await;
        let provider = RemoteLlmProvider::new(&settings(&url, Some("sk-bad"))).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderAuthError(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_generation_failure() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let url = spawn_backend(router).await;
        let provider = RemoteLlmProvider::new(&settings(&url, Some("sk-test"))).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::GenerationFailure(_)));
    }

    #[tokio::test]
    async fn test_no_choices_is_generation_failure() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let url = spawn_backend(router).await;
        let provider = RemoteLlmProvider::new(&settings(&url, Some("sk-test"))).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::GenerationFailure(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let provider = RemoteLlmProvider::new(&settings(&dead_url().await, Some("sk-test"))).unwrap();

        let err = provider.generate_sql("q", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::ProviderUnavailable(_)));
        let msg = err.to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(msg.contains("base URL"));
    }
}
