use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{apply_timeout, send_json, TextAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::{Generation, TextRequest};
use crate::errors::{BlacklightError, Result};

pub struct OllamaAdapter {
    client: Client,
}

impl OllamaAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextAdapter for OllamaAdapter {
    fn label(&self) -> &'static str {
        "Ollama"
    }

    fn empty_notice(&self) -> &'static str {
        "Ollama returned no text."
    }

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation> {
        if !config.has_endpoint() {
            return Err(BlacklightError::config("Ollama endpoint is not configured"));
        }
        let url = format!("{}/api/generate", config.base_url());
        let params = config.params.sanitized();
        let payload = json!({
            "model": request.model(config),
            "prompt": request.prompt,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_new_tokens,
            },
            "stream": false,
        });
        let body = send_json(
            apply_timeout(self.client.post(url), config).json(&payload),
            self.label(),
        )
        .await?;
        Ok(Generation::from_text(body.get("response").and_then(Value::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::BackendMode;
    use httpmock::prelude::*;

    fn request() -> TextRequest {
        TextRequest {
            prompt: "System: x\n\nUser: hello\n\nAssistant:".into(),
            prior: Vec::new(),
            model: None,
        }
    }

    fn config_for(server: &MockServer) -> BackendConfig {
        let mut config = BackendConfig::for_mode(BackendMode::Ollama);
        config.endpoint = format!("{}/", server.base_url());
        config.params.temperature = 0.5;
        config.params.max_new_tokens = 64;
        config
    }

    #[tokio::test]
    async fn sends_generate_request_with_options() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate").json_body(serde_json::json!({
                    "model": "llama3.1:8b",
                    "prompt": "System: x\n\nUser: hello\n\nAssistant:",
                    "options": {"temperature": 0.5, "num_predict": 64},
                    "stream": false
                }));
                then.status(200).json_body(serde_json::json!({"response": "[complete] hi"}));
            })
            .await;

        let adapter = OllamaAdapter::new(Client::new());
        let out = adapter.send(&request(), &config_for(&server)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(out, Generation::Text("[complete] hi".into()));
    }

    #[tokio::test]
    async fn default_temperature_is_sent_unchanged() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("\"temperature\":0.7")
                    .body_contains("\"num_predict\":2048");
                then.status(200).json_body(serde_json::json!({"response": "ok"}));
            })
            .await;

        let mut config = BackendConfig::for_mode(BackendMode::Ollama);
        config.endpoint = server.base_url();
        let adapter = OllamaAdapter::new(Client::new());
        adapter.send(&request(), &config).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_response_field_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(serde_json::json!({"done": true}));
            })
            .await;

        let adapter = OllamaAdapter::new(Client::new());
        let out = adapter.send(&request(), &config_for(&server)).await.unwrap();
        assert_eq!(out, Generation::Empty);
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("model not loaded");
            })
            .await;

        let adapter = OllamaAdapter::new(Client::new());
        let err = adapter
            .send(&request(), &config_for(&server))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Ollama error 500: model not loaded");
    }
}
