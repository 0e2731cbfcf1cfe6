use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64_ENGINE;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use super::{apply_timeout, check_status, ImageAdapter, TextAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::{Generation, ImageRequest, TextRequest};
use crate::errors::{BlacklightError, Result};
use crate::selector::MODEL_CATALOG;

/// Hugging Face hosted inference, for both text and image models.
pub struct HuggingFaceAdapter {
    client: Client,
}

impl HuggingFaceAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn token(config: &BackendConfig) -> Result<&str> {
    config
        .credential
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BlacklightError::config("Hugging Face token is not configured"))
}

/// `{endpoint}/models/{model}` with the model id as one encoded segment.
fn model_url(config: &BackendConfig, model: &str) -> Result<Url> {
    let mut url = Url::parse(config.base_url()).map_err(|err| {
        BlacklightError::config(format!("Invalid inference endpoint {}: {err}", config.endpoint))
    })?;
    url.path_segments_mut()
        .map_err(|_| BlacklightError::config("Inference endpoint cannot carry a model path"))?
        .pop_if_empty()
        .push("models")
        .push(model);
    Ok(url)
}

/// Accepts `[{generated_text}]`, `{generated_text}` or `{error}`.
fn extract_generated_text(body: &Value, status: u16) -> Result<Generation> {
    let candidate = match body {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(body),
        _ => None,
    };
    if let Some(text) = candidate
        .and_then(|item| item.get("generated_text"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
    {
        return Ok(Generation::Text(text.to_string()));
    }
    if let Some(error) = body.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(BlacklightError::backend(Some(status), message));
    }
    Ok(Generation::Empty)
}

#[async_trait]
impl TextAdapter for HuggingFaceAdapter {
    fn label(&self) -> &'static str {
        "HF"
    }

    fn empty_notice(&self) -> &'static str {
        "Model returned unexpected format."
    }

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation> {
        let secret = token(config)?;
        let url = model_url(config, request.model(config))?;
        let params = config.params.sanitized();
        let payload = json!({
            "inputs": request.prompt,
            "parameters": {
                "max_new_tokens": params.max_new_tokens,
                "temperature": params.temperature,
                "return_full_text": false,
            },
            "options": {"wait_for_model": true},
        });
        let response = apply_timeout(self.client.post(url), config)
            .bearer_auth(secret)
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response, self.label()).await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        extract_generated_text(&body, status)
    }
}

#[async_trait]
impl ImageAdapter for HuggingFaceAdapter {
    async fn generate(
        &self,
        request: &ImageRequest,
        config: &BackendConfig,
    ) -> Result<Option<String>> {
        let secret = token(config)?;
        let model = request
            .model
            .as_deref()
            .or_else(|| MODEL_CATALOG.image.first().map(|entry| entry.id))
            .ok_or_else(|| BlacklightError::config("No image model configured"))?;
        let url = model_url(config, model)?;
        let payload = json!({
            "inputs": request.prompt,
            "parameters": MODEL_CATALOG.image_parameters(model),
        });
        let response = apply_timeout(self.client.post(url), config)
            .bearer_auth(secret)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BlacklightError::backend(
                Some(status.as_u16()),
                format!("Image generation failed: {}", status.as_u16()),
            ));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!(
            "data:{content_type};base64,{}",
            B64_ENGINE.encode(&bytes)
        )))
    }
}
