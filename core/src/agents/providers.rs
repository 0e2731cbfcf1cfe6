use super::config::BackendMode;

/// Static description of a backend used to build its default configuration.
pub struct ProviderSeed {
    pub mode: BackendMode,
    pub display: &'static str,
    pub description: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub requires_api_key: bool,
    pub tags: &'static [&'static str],
}

pub const PROVIDER_SEEDS: &[ProviderSeed] = &[
    ProviderSeed {
        mode: BackendMode::LocalRuntime,
        display: "WebLLM (local runtime)",
        description: "On-device model runtime exposing a chat-completion interface",
        base_url: "http://127.0.0.1:8000",
        default_model: "Phi-3.5-mini-instruct-q4f16_1",
        requires_api_key: false,
        tags: &["local", "chat", "openai-compatible"],
    },
    ProviderSeed {
        mode: BackendMode::Ollama,
        display: "Ollama",
        description: "Local Ollama server using the generate endpoint",
        base_url: "http://localhost:11434",
        default_model: "llama3.1:8b",
        requires_api_key: false,
        tags: &["local", "generate"],
    },
    ProviderSeed {
        mode: BackendMode::Automatic1111,
        display: "Automatic1111",
        description: "Local Stable Diffusion web UI (txt2img)",
        base_url: "http://127.0.0.1:7860",
        default_model: "",
        requires_api_key: false,
        tags: &["local", "image"],
    },
    ProviderSeed {
        mode: BackendMode::OpenRouter,
        display: "OpenRouter",
        description: "Hosted router for chat-completion models",
        base_url: "https://openrouter.ai/api/v1",
        default_model: "openai/gpt-4o-mini",
        requires_api_key: true,
        tags: &["cloud", "chat", "vision"],
    },
    ProviderSeed {
        mode: BackendMode::HuggingFace,
        display: "Hugging Face Inference",
        description: "Hosted inference API for text and image models",
        base_url: "https://api-inference.huggingface.co",
        default_model: "mistralai/Mistral-7B-Instruct-v0.3",
        requires_api_key: true,
        tags: &["cloud", "generate", "image"],
    },
    ProviderSeed {
        mode: BackendMode::Custom,
        display: "Custom endpoint",
        description: "Any HTTP endpoint accepting {prompt, max_new_tokens, temperature}",
        base_url: "",
        default_model: "",
        requires_api_key: false,
        tags: &["custom"],
    },
];

pub fn seed_for(mode: BackendMode) -> &'static ProviderSeed {
    PROVIDER_SEEDS
        .iter()
        .find(|seed| seed.mode == mode)
        .unwrap_or(&PROVIDER_SEEDS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_a_seed() {
        for mode in BackendMode::ALL {
            assert_eq!(seed_for(mode).mode, mode);
        }
    }
}
