//! One adapter per backend kind, each performing a single HTTP call.
//!
//! Adapters never retry and never touch session state; they translate a
//! request into the backend's contract and normalise the reply.

mod a1111;
mod custom;
mod huggingface;
mod ollama;
mod openrouter;
mod webllm;

pub use a1111::Automatic1111Adapter;
pub use custom::CustomAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use ollama::OllamaAdapter;
pub use openrouter::OpenRouterAdapter;
pub use webllm::LocalRuntimeAdapter;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;

use super::config::BackendConfig;
use super::orchestrator::{Generation, ImageRequest, TextRequest};
use crate::errors::{BlacklightError, Result};

#[async_trait]
pub trait TextAdapter: Send + Sync {
    fn label(&self) -> &'static str;

    /// Rendered in place of an `Empty` generation.
    fn empty_notice(&self) -> &'static str;

    async fn send(&self, request: &TextRequest, config: &BackendConfig) -> Result<Generation>;
}

#[async_trait]
pub trait ImageAdapter: Send + Sync {
    /// Returns a data URL, or `None` when the backend produced no image.
    async fn generate(
        &self,
        request: &ImageRequest,
        config: &BackendConfig,
    ) -> Result<Option<String>>;
}

pub(crate) fn apply_timeout(request: RequestBuilder, config: &BackendConfig) -> RequestBuilder {
    match config.timeout {
        Some(timeout) => request.timeout(timeout),
        None => request,
    }
}

/// Fails with `BackendError` on a non-success status, carrying the body.
pub(crate) async fn check_status(response: Response, label: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BlacklightError::backend(
        Some(status.as_u16()),
        format!("{label} error {}: {body}", status.as_u16()),
    ))
}

pub(crate) async fn send_json(request: RequestBuilder, label: &str) -> Result<Value> {
    let response = check_status(request.send().await?, label).await?;
    Ok(response.json().await?)
}

/// `choices[0].message.content` of a chat-completion object.
pub(crate) fn extract_chat_completion(body: &Value) -> Generation {
    Generation::from_text(
        body.get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(Value::as_str),
    )
}
