//! OpenAI-compatible completion client.
//!
//! Talks to any server implementing the chat completions API (vLLM,
//! llama.cpp, Groq, OpenAI). A LoRA adapter served by the same server is
//! selected purely through the `model` field, so the client does not care
//! whether it is addressing a base model or an adapted one.

use super::{GenerationRequest, TextGenerator};
use crate::config::GenerationConfig;
use crate::error::{GenerateError, LoadError};
use serde::Deserialize;

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Exclusively owns its connection pool; dropping the client releases it.
/// The model is fixed at connect time; pointing at a different model or
/// adapter means connecting a new client.
pub struct CompletionClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    config: GenerationConfig,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl CompletionClient {
    /// Connect to the server and verify that `model` is served.
    ///
    /// Probes the `/models` listing; an unreachable server or an unknown
    /// model id is a [`LoadError`] — the caller has nothing to run
    /// against, so there is no point constructing the client.
    pub async fn connect(
        api_base: &str,
        api_key: Option<&str>,
        model: &str,
        config: GenerationConfig,
    ) -> Result<Self, LoadError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LoadError::Connect {
                api_base: api_base.to_string(),
                reason: e.to_string(),
            })?;

        let client = Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
            config,
        };

        client.verify_model().await?;
        log::info!("Connected to {} serving '{}'", client.api_base, client.model);
        Ok(client)
    }

    /// The model id requests are routed to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The generation parameters sent with every request.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    async fn verify_model(&self) -> Result<(), LoadError> {
        let url = format!("{}/models", self.api_base);
        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| LoadError::Connect {
            api_base: self.api_base.clone(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(LoadError::Connect {
                api_base: self.api_base.clone(),
                reason: format!("model listing returned HTTP {}", response.status()),
            });
        }

        let listing: ModelList = response.json().await.map_err(|e| LoadError::Connect {
            api_base: self.api_base.clone(),
            reason: format!("unparseable model listing: {e}"),
        })?;

        if listing.data.iter().any(|m| m.id == self.model) {
            Ok(())
        } else {
            Err(LoadError::ModelUnavailable {
                model: self.model.clone(),
            })
        }
    }

    /// Execute a single completion request (no retries).
    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": request.prompt}],
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": request.max_new_tokens,
        });

        let mut http_request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerateError::Timeout(self.config.timeout.as_millis() as u64)
            } else {
                GenerateError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(GenerateError::RateLimit(body));
            }
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Other(format!("unparseable completion: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerateError::NoContent);
        }
        Ok(text)
    }
}

impl TextGenerator for CompletionClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerateError> {
        if request.prompt.is_empty() {
            return Err(GenerateError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.generate_once(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    log::warn!(
                        "Completion request failed (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(self.config.retry_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }

        // Unreachable in practice: the loop either returns or exhausts retries
        // through the non-retryable arm.
        Err(last_error
            .unwrap_or_else(|| GenerateError::Other("Retry loop exited unexpectedly".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn models_body(ids: &[&str]) -> serde_json::Value {
        json!({
            "object": "list",
            "data": ids.iter().map(|id| json!({"id": id, "object": "model"})).collect::<Vec<_>>(),
        })
    }

    fn chat_body(text: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 10},
        })
    }

    async fn connected_client(server: &MockServer, config: GenerationConfig) -> CompletionClient {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body(&["phi-3-mini"])))
            .mount(server)
            .await;

        CompletionClient::connect(
            &format!("{}/v1", server.uri()),
            None,
            "phi-3-mini",
            config,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_verifies_served_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body(&["other-model"])))
            .mount(&server)
            .await;

        let result = CompletionClient::connect(
            &format!("{}/v1", server.uri()),
            None,
            "phi-3-mini",
            GenerationConfig::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(LoadError::ModelUnavailable { model }) if model == "phi-3-mini"
        ));
    }

    #[tokio::test]
    async fn test_connect_unreachable_server() {
        // Nothing listens on this port.
        let result = CompletionClient::connect(
            "http://127.0.0.1:9/v1",
            None,
            "phi-3-mini",
            GenerationConfig::default().with_timeout(std::time::Duration::from_millis(500)),
        )
        .await;

        assert!(matches!(result, Err(LoadError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_generate_returns_completion_text() {
        let server = MockServer::start().await;
        let client = connected_client(&server, GenerationConfig::default()).await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"model": "phi-3-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Step 1... #### 42")))
            .mount(&server)
            .await;

        let text = client
            .generate(GenerationRequest::new("solve it", 512))
            .await
            .unwrap();
        assert_eq!(text, "Step 1... #### 42");
    }

    #[tokio::test]
    async fn test_generate_sends_sampling_parameters() {
        let server = MockServer::start().await;
        let config = GenerationConfig::default()
            .with_temperature(0.7)
            .with_top_p(0.9);
        let client = connected_client(&server, config).await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "temperature": 0.7,
                "top_p": 0.9,
                "max_tokens": 128,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("ok")))
            .expect(1)
            .mount(&server)
            .await;

        client
            .generate(GenerationRequest::new("solve it", 128))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generate_retries_server_errors() {
        let server = MockServer::start().await;
        let config = GenerationConfig::default()
            .with_max_retries(2)
            .with_retry_base_delay_ms(1);
        let client = connected_client(&server, config).await;

        // First attempt fails with 503, mock is consumed, second succeeds.
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("recovered")))
            .with_priority(2)
            .mount(&server)
            .await;

        let text = client
            .generate(GenerationRequest::new("solve it", 512))
            .await
            .unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn test_generate_rate_limit_maps_to_rate_limit_error() {
        let server = MockServer::start().await;
        let config = GenerationConfig::default()
            .with_max_retries(0)
            .with_retry_base_delay_ms(1);
        let client = connected_client(&server, config).await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let result = client.generate(GenerationRequest::new("solve it", 512)).await;
        assert!(matches!(result, Err(GenerateError::RateLimit(_))));
    }

    #[tokio::test]
    async fn test_generate_empty_completion_is_no_content() {
        let server = MockServer::start().await;
        let client = connected_client(&server, GenerationConfig::default()).await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("")))
            .mount(&server)
            .await;

        let result = client.generate(GenerationRequest::new("solve it", 512)).await;
        assert!(matches!(result, Err(GenerateError::NoContent)));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_prompt() {
        let server = MockServer::start().await;
        let client = connected_client(&server, GenerationConfig::default()).await;

        let result = client.generate(GenerationRequest::new("", 512)).await;
        assert!(matches!(result, Err(GenerateError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_debug_redacts_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(models_body(&["phi-3-mini"])))
            .mount(&server)
            .await;

        let client = CompletionClient::connect(
            &format!("{}/v1", server.uri()),
            Some("sk-secret-12345"),
            "phi-3-mini",
            GenerationConfig::default(),
        )
        .await
        .unwrap();

        let debug = format!("{:?}", client);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret-12345"));
    }
}
