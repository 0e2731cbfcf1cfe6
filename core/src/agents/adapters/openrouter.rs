use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;

use super::{apply_timeout, extract_chat_completion, send_json, TextAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::{Generation, TextRequest};
use crate::errors::{BlacklightError, Result};
use crate::prompt::{chat_messages, ROUTER_SYSTEM_LINE};

const REFERER: &str = "http://localhost";
const APP_TITLE: &str = "BLACKLIGHT";
const VISION_SYSTEM_LINE: &str = "You are an expert visual analyst.";
const DEFAULT_VISION_PROMPT: &str = "Analyze this image.";

pub struct OpenRouterAdapter {
    client: Client,
}

impl OpenRouterAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn authorized_post(&self, config: &BackendConfig) -> Result<RequestBuilder> {
        let secret = config
            .credential
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                BlacklightError::config("Missing OpenRouter API key (set OPENROUTER_API_KEY)")
            })?;
        let url = format!("{}/chat/completions", config.base_url());
        let request = self
            .client
            .post(url)
            .bearer_auth(secret)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE);
        Ok(apply_timeout(request, config))
    }

    /// Single-turn image analysis with a text + image_url message.
    pub async fn vision(
        &self,
        prompt: &str,
        image_url: &str,
        config: &BackendConfig,
    ) -> Result<Generation> {
        let request = self.authorized_post(config)?;
        let text = if prompt.trim().is_empty() {
            DEFAULT_VISION_PROMPT
        } else {
            prompt
        };
        let payload = json!({
            "model": config.model,
            "messages": [
                {"role": "system", "content": VISION_SYSTEM_LINE},
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": text},
                        {"type": "image_url", "image_url": {"url": image_url}},
                    ],
                },
            ],
            "temperature": config.params.sanitized().temperature,
            "stream": false,
        });
        let body = send_json(request.json(&payload), self.label()).await?;
        Ok(extract_chat_completion(&body))
    }
}

#[async_trait]
impl TextAdapter for OpenRouterAdapter {
    fn label(&self) -> &'static str {
        "OpenRouter"
    }

    fn empty_notice(&self) -> &'static str {
        "OpenRouter returned no text."
    }

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation> {
        let http = self.authorized_post(config)?;
        let params = config.params.sanitized();
        let payload = json!({
            "model": request.model(config),
            "messages": chat_messages(ROUTER_SYSTEM_LINE, &request.prior, &request.prompt),
            "temperature": params.temperature,
            "max_tokens": params.max_new_tokens,
            "stream": false,
        });
        let body = send_json(http.json(&payload), self.label()).await?;
        Ok(extract_chat_completion(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::BackendMode;
    use httpmock::prelude::*;

    fn request() -> TextRequest {
        TextRequest {
            prompt: "System: x\n\nUser: hi\n\nAssistant:".into(),
            prior: Vec::new(),
            model: None,
        }
    }

    fn config_for(server: &MockServer) -> BackendConfig {
        let mut config = BackendConfig::for_mode(BackendMode::OpenRouter);
        config.endpoint = server.url("/api/v1");
        config.credential = Some("sk-or-test".into());
        config
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let mut config = config_for(&server);
        config.credential = None;
        let adapter = OpenRouterAdapter::new(Client::new());
        let err = adapter.send(&request(), &config).await.unwrap_err();
        assert!(matches!(err, BlacklightError::Config(_)));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn sends_bearer_and_reads_chat_completion() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/chat/completions")
                    .header("authorization", "Bearer sk-or-test")
                    .header("x-title", "BLACKLIGHT")
                    .json_body_partial(
                        r#"{"model": "openai/gpt-4o-mini", "stream": false, "messages": [{"role": "system", "content": "You are BLACKLIGHT, a concise, helpful AI."}, {"role": "user", "content": "System: x\n\nUser: hi\n\nAssistant:"}]}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"content": "[complete] routed"}}]
                }));
            })
            .await;

        let adapter = OpenRouterAdapter::new(Client::new());
        let out = adapter.send(&request(), &config_for(&server)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(out, Generation::Text("[complete] routed".into()));
    }

    #[tokio::test]
    async fn vision_sends_image_part() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/chat/completions")
                    .body_contains("\"image_url\"")
                    .body_contains("data:image/png;base64,AAAA");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"content": "a red square"}}]
                }));
            })
            .await;

        let adapter = OpenRouterAdapter::new(Client::new());
        let out = adapter
            .vision("", "data:image/png;base64,AAAA", &config_for(&server))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(out, Generation::Text("a red square".into()));
    }

    #[tokio::test]
    async fn error_status_becomes_backend_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/chat/completions");
                then.status(401).body("{\"error\":\"bad key\"}");
            })
            .await;

        let adapter = OpenRouterAdapter::new(Client::new());
        let err = adapter
            .send(&request(), &config_for(&server))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("bad key"));
    }
}
