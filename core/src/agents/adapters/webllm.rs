use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{apply_timeout, extract_chat_completion, send_json, TextAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::{Generation, TextRequest};
use crate::errors::{BlacklightError, Result};
use crate::prompt::{chat_messages, RUNTIME_SYSTEM_LINE};

/// On-device runtime reached through its local chat-completion interface
/// (for example an MLC LLM server).
pub struct LocalRuntimeAdapter {
    client: Client,
}

impl LocalRuntimeAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextAdapter for LocalRuntimeAdapter {
    fn label(&self) -> &'static str {
        "WebLLM"
    }

    fn empty_notice(&self) -> &'static str {
        "WebLLM returned no text."
    }

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation> {
        if !config.has_endpoint() {
            return Err(BlacklightError::unsupported(
                "No local model runtime is available on this host. Start a chat-completion runtime and set its endpoint.",
            ));
        }
        let url = format!("{}/v1/chat/completions", config.base_url());
        let params = config.params.sanitized();
        let payload = json!({
            "model": request.model(config),
            "messages": chat_messages(RUNTIME_SYSTEM_LINE, &request.prior, &request.prompt),
            "temperature": params.temperature,
            "max_tokens": params.max_new_tokens,
            "stream": false,
        });
        let body = send_json(
            apply_timeout(self.client.post(url), config).json(&payload),
            self.label(),
        )
        .await?;
        Ok(extract_chat_completion(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::config::BackendMode;
    use crate::session::ConversationTurn;
    use httpmock::prelude::*;

    fn request() -> TextRequest {
        TextRequest {
            prompt: "System: ...\n\nUser: hi\n\nAssistant:".into(),
            prior: vec![ConversationTurn::user("earlier")],
            model: None,
        }
    }

    #[tokio::test]
    async fn posts_chat_messages_and_reads_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(
                        r#"{"model": "Phi-3.5-mini-instruct-q4f16_1", "stream": false, "messages": [{"role": "system", "content": "You are BLACKLIGHT: concise, precise."}, {"role": "user", "content": "earlier"}, {"role": "user", "content": "System: ...\n\nUser: hi\n\nAssistant:"}]}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "[trace] ok"}}]
                }));
            })
            .await;

        let mut config = BackendConfig::for_mode(BackendMode::LocalRuntime);
        config.endpoint = server.base_url();
        let adapter = LocalRuntimeAdapter::new(Client::new());
        let out = adapter.send(&request(), &config).await.unwrap();
        mock.assert_async().await;
        assert_eq!(out, Generation::Text("[trace] ok".into()));
    }

    #[tokio::test]
    async fn missing_runtime_is_unsupported_environment() {
        let mut config = BackendConfig::for_mode(BackendMode::LocalRuntime);
        config.endpoint.clear();
        let adapter = LocalRuntimeAdapter::new(Client::new());
        let err = adapter.send(&request(), &config).await.unwrap_err();
        assert!(matches!(err, BlacklightError::UnsupportedEnvironment(_)));
    }
}
