use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::adapters::{
    Automatic1111Adapter, CustomAdapter, HuggingFaceAdapter, ImageAdapter, LocalRuntimeAdapter,
    OllamaAdapter, OpenRouterAdapter, TextAdapter,
};
use super::config::{BackendConfig, BackendMode};
use crate::errors::{BlacklightError, Result};
use crate::session::ConversationTurn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Outcome of a text call. `Empty` means the backend answered in a known
/// shape but produced nothing usable.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    Empty,
}

impl Generation {
    pub fn from_text(text: Option<&str>) -> Self {
        match text {
            Some(t) if !t.trim().is_empty() => Self::Text(t.to_string()),
            _ => Self::Empty,
        }
    }
}

/// Everything a text adapter may need for one call.
#[derive(Debug, Clone)]
pub struct TextRequest {
    /// Fully composed prompt, including history and the assistant cue.
    pub prompt: String,
    /// Turns preceding the current one, for chat-framed backends.
    pub prior: Vec<ConversationTurn>,
    /// Replaces `BackendConfig::model` when set.
    pub model: Option<String>,
}

impl TextRequest {
    pub fn model<'a>(&'a self, config: &'a BackendConfig) -> &'a str {
        self.model.as_deref().unwrap_or(&config.model)
    }
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: Option<String>,
}

/// Closed set of provider adapters, one per backend mode.
pub enum Adapter {
    LocalRuntime(LocalRuntimeAdapter),
    Ollama(OllamaAdapter),
    Automatic1111(Automatic1111Adapter),
    OpenRouter(OpenRouterAdapter),
    HuggingFace(HuggingFaceAdapter),
    Custom(CustomAdapter),
}

impl Adapter {
    pub fn for_mode(mode: BackendMode, client: Client) -> Self {
        match mode {
            BackendMode::LocalRuntime => Self::LocalRuntime(LocalRuntimeAdapter::new(client)),
            BackendMode::Ollama => Self::Ollama(OllamaAdapter::new(client)),
            BackendMode::Automatic1111 => Self::Automatic1111(Automatic1111Adapter::new(client)),
            BackendMode::OpenRouter => Self::OpenRouter(OpenRouterAdapter::new(client)),
            BackendMode::HuggingFace => Self::HuggingFace(HuggingFaceAdapter::new(client)),
            BackendMode::Custom => Self::Custom(CustomAdapter::new(client)),
        }
    }

    pub fn as_text(&self) -> Option<&dyn TextAdapter> {
        match self {
            Self::LocalRuntime(a) => Some(a),
            Self::Ollama(a) => Some(a),
            Self::OpenRouter(a) => Some(a),
            Self::HuggingFace(a) => Some(a),
            Self::Custom(a) => Some(a),
            Self::Automatic1111(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&dyn ImageAdapter> {
        match self {
            Self::Automatic1111(a) => Some(a),
            Self::HuggingFace(a) => Some(a),
            _ => None,
        }
    }
}

/// Owns the shared HTTP client and routes calls to the adapter of a mode.
pub struct AiOrchestrator {
    client: Client,
}

impl AiOrchestrator {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("BLACKLIGHT-Core/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn adapter(&self, mode: BackendMode) -> Adapter {
        Adapter::for_mode(mode, self.client.clone())
    }

    pub async fn send(
        &self,
        mode: BackendMode,
        request: &TextRequest,
        config: &BackendConfig,
    ) -> Result<Generation> {
        let adapter = self.adapter(mode);
        let text = adapter.as_text().ok_or_else(|| {
            BlacklightError::config(format!(
                "{} only generates images; ask for an image or switch backend",
                mode.display_name()
            ))
        })?;
        text.send(request, config).await
    }

    pub async fn generate_image(
        &self,
        mode: BackendMode,
        request: &ImageRequest,
        config: &BackendConfig,
    ) -> Result<Option<String>> {
        let adapter = self.adapter(mode);
        let image = adapter.as_image().ok_or_else(|| {
            BlacklightError::config(format!(
                "{} cannot generate images",
                mode.display_name()
            ))
        })?;
        image.generate(request, config).await
    }

    pub async fn analyze_image(
        &self,
        mode: BackendMode,
        prompt: &str,
        image_url: &str,
        config: &BackendConfig,
    ) -> Result<Generation> {
        match self.adapter(mode) {
            Adapter::OpenRouter(router) => router.vision(prompt, image_url, config).await,
            _ => Err(BlacklightError::config(format!(
                "Image analysis requires OpenRouter; {} is active",
                mode.display_name()
            ))),
        }
    }

    /// Short human label for the adapter of a mode.
    pub fn label(&self, mode: BackendMode) -> &'static str {
        self.adapter(mode)
            .as_text()
            .map(|a| a.label())
            .unwrap_or_else(|| mode.display_name())
    }

    /// Text shown when the adapter of a mode produced nothing usable.
    pub fn empty_notice(&self, mode: BackendMode) -> &'static str {
        self.adapter(mode)
            .as_text()
            .map(|a| a.empty_notice())
            .unwrap_or("Backend returned no text.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_counts_as_empty() {
        assert_eq!(Generation::from_text(Some("  \n")), Generation::Empty);
        assert_eq!(Generation::from_text(None), Generation::Empty);
        assert_eq!(
            Generation::from_text(Some("hi")),
            Generation::Text("hi".into())
        );
    }

    #[test]
    fn image_capability_matches_modes() {
        let orchestrator = AiOrchestrator::with_client(Client::new());
        for mode in BackendMode::ALL {
            let adapter = orchestrator.adapter(mode);
            assert_eq!(adapter.as_image().is_some(), mode.is_image_capable());
            assert_eq!(adapter.as_text().is_none(), mode == BackendMode::Automatic1111);
        }
    }

    #[tokio::test]
    async fn text_request_to_image_server_is_a_config_error() {
        let orchestrator = AiOrchestrator::with_client(Client::new());
        let request = TextRequest {
            prompt: "hello".into(),
            prior: Vec::new(),
            model: None,
        };
        let config = BackendConfig::for_mode(BackendMode::Automatic1111);
        let err = orchestrator
            .send(BackendMode::Automatic1111, &request, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, BlacklightError::Config(_)));
    }
}
