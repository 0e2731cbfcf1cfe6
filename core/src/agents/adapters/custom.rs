use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{apply_timeout, send_json, TextAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::{Generation, TextRequest};
use crate::errors::{BlacklightError, Result};

/// Arbitrary endpoint speaking `{prompt, max_new_tokens, temperature}` -> `{text}`.
pub struct CustomAdapter {
    client: Client,
}

impl CustomAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextAdapter for CustomAdapter {
    fn label(&self) -> &'static str {
        "Endpoint"
    }

    fn empty_notice(&self) -> &'static str {
        "Endpoint returned no text."
    }

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation> {
        if !config.has_endpoint() {
            return Err(BlacklightError::config("Custom endpoint URL is empty"));
        }
        let params = config.params.sanitized();
        let payload = json!({
            "prompt": request.prompt,
            "max_new_tokens": params.max_new_tokens,
            "temperature": params.temperature,
        });
        let body = send_json(
            apply_timeout(self.client.post(config.endpoint.trim()), config).json(&payload),
            self.label(),
        )
        .await?;
        Ok(Generation::from_text(body.get("text").and_then(Value::as_str)))
    }
}
