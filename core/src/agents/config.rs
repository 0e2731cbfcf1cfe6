use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::providers::{seed_for, PROVIDER_SEEDS};
use crate::errors::BlacklightError;

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Environment variables consulted for the hosted-router credential, in order.
pub const OPENROUTER_KEY_VARS: &[&str] = &["OPENROUTER_API_KEY", "VITE_OPENROUTER_KEY"];

/// Which provider adapter is active. Exactly one is selected per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendMode {
    #[serde(rename = "webllm")]
    LocalRuntime,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "a1111")]
    Automatic1111,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "hf")]
    HuggingFace,
    #[serde(rename = "custom")]
    Custom,
}

impl BackendMode {
    pub const ALL: [BackendMode; 6] = [
        BackendMode::LocalRuntime,
        BackendMode::Ollama,
        BackendMode::Automatic1111,
        BackendMode::OpenRouter,
        BackendMode::HuggingFace,
        BackendMode::Custom,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::LocalRuntime => "webllm",
            Self::Ollama => "ollama",
            Self::Automatic1111 => "a1111",
            Self::OpenRouter => "openrouter",
            Self::HuggingFace => "hf",
            Self::Custom => "custom",
        }
    }

    pub fn display_name(self) -> &'static str {
        seed_for(self).display
    }

    /// Modes whose adapter can turn a prompt into an image.
    pub fn is_image_capable(self) -> bool {
        matches!(self, Self::Automatic1111 | Self::HuggingFace)
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BackendMode {
    type Err = BlacklightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        BackendMode::ALL
            .into_iter()
            .find(|mode| mode.id() == needle)
            .ok_or_else(|| BlacklightError::config(format!("Unknown backend mode: {s}")))
    }
}

/// Numeric generation controls sent with every text request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GenerationParams {
    /// Zero, negative or non-finite inputs fall back to the defaults.
    pub fn sanitized(self) -> Self {
        let max_new_tokens = if self.max_new_tokens == 0 {
            DEFAULT_MAX_NEW_TOKENS
        } else {
            self.max_new_tokens
        };
        let temperature = if self.temperature.is_finite() && self.temperature > 0.0 {
            self.temperature
        } else {
            DEFAULT_TEMPERATURE
        };
        Self {
            max_new_tokens,
            temperature,
        }
    }
}

/// Connection parameters for a single backend mode.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub endpoint: String,
    pub model: String,
    pub credential: Option<String>,
    pub params: GenerationParams,
    /// Optional per-request deadline; `None` waits for the backend indefinitely.
    pub timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn for_mode(mode: BackendMode) -> Self {
        let seed = seed_for(mode);
        Self {
            endpoint: seed.base_url.to_string(),
            model: seed.default_model.to_string(),
            credential: None,
            params: GenerationParams::default(),
            timeout: None,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    pub fn has_endpoint(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }

    /// Endpoint without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}

/// One configuration per mode, all present for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfigs {
    local_runtime: BackendConfig,
    ollama: BackendConfig,
    automatic1111: BackendConfig,
    openrouter: BackendConfig,
    huggingface: BackendConfig,
    custom: BackendConfig,
}

impl Default for BackendConfigs {
    fn default() -> Self {
        Self {
            local_runtime: BackendConfig::for_mode(BackendMode::LocalRuntime),
            ollama: BackendConfig::for_mode(BackendMode::Ollama),
            automatic1111: BackendConfig::for_mode(BackendMode::Automatic1111),
            openrouter: BackendConfig::for_mode(BackendMode::OpenRouter),
            huggingface: BackendConfig::for_mode(BackendMode::HuggingFace),
            custom: BackendConfig::for_mode(BackendMode::Custom),
        }
    }
}

impl BackendConfigs {
    /// Defaults plus whatever credentials the environment provides.
    pub fn from_env() -> Self {
        let mut configs = Self::default();
        configs.openrouter.credential = openrouter_key_from_env();
        configs
    }

    pub fn get(&self, mode: BackendMode) -> &BackendConfig {
        match mode {
            BackendMode::LocalRuntime => &self.local_runtime,
            BackendMode::Ollama => &self.ollama,
            BackendMode::Automatic1111 => &self.automatic1111,
            BackendMode::OpenRouter => &self.openrouter,
            BackendMode::HuggingFace => &self.huggingface,
            BackendMode::Custom => &self.custom,
        }
    }

    pub fn get_mut(&mut self, mode: BackendMode) -> &mut BackendConfig {
        match mode {
            BackendMode::LocalRuntime => &mut self.local_runtime,
            BackendMode::Ollama => &mut self.ollama,
            BackendMode::Automatic1111 => &mut self.automatic1111,
            BackendMode::OpenRouter => &mut self.openrouter,
            BackendMode::HuggingFace => &mut self.huggingface,
            BackendMode::Custom => &mut self.custom,
        }
    }
}

pub fn openrouter_key_from_env() -> Option<String> {
    OPENROUTER_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Explicit user configuration action against one mode's settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// An empty or blank value clears the stored credential.
    pub credential: Option<String>,
    pub max_new_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_none()
            && self.model.is_none()
            && self.credential.is_none()
            && self.max_new_tokens.is_none()
            && self.temperature.is_none()
            && self.timeout_secs.is_none()
    }

    pub fn apply(self, config: &mut BackendConfig) {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint.trim().to_string();
        }
        if let Some(model) = self.model {
            config.model = model.trim().to_string();
        }
        if let Some(credential) = self.credential {
            let trimmed = credential.trim();
            config.credential = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
        if let Some(max_new_tokens) = self.max_new_tokens {
            config.params.max_new_tokens = max_new_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.params.temperature = temperature;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.params = config.params.sanitized();
    }
}

/// Read-only view of a backend for the presentation layer. Never carries the
/// credential itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub mode: BackendMode,
    pub display_name: String,
    pub description: String,
    pub endpoint: String,
    pub model: String,
    pub capability_tags: Vec<String>,
    pub requires_api_key: bool,
    pub has_credentials: bool,
}

pub fn list_providers(configs: &BackendConfigs) -> Vec<ProviderInfo> {
    PROVIDER_SEEDS
        .iter()
        .map(|seed| {
            let config = configs.get(seed.mode);
            ProviderInfo {
                mode: seed.mode,
                display_name: seed.display.to_string(),
                description: seed.description.to_string(),
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                capability_tags: seed.tags.iter().map(|t| t.to_string()).collect(),
                requires_api_key: seed.requires_api_key,
                has_credentials: config.has_credential(),
            }
        })
        .collect()
}
