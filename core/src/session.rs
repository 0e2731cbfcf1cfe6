//! In-memory session state and its JSON export document.
//!
//! The session owns every configuration knob the console exposes. The
//! presentation layer reads it and changes it only through the intent API.

use serde::{Deserialize, Serialize};

use crate::agents::config::{BackendConfig, BackendConfigs, BackendMode};
use crate::errors::Result;
use crate::prompt::ModeOverlay;
use crate::selector::MODEL_CATALOG;

pub const EXPORT_FILE_NAME: &str = "blacklight-session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_code: bool,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_url: None,
            is_code: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image_url: None,
            is_code: false,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_code_flag(mut self, is_code: bool) -> Self {
        self.is_code = is_code;
        self
    }

    pub fn is_image(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn renders_as_code(&self) -> bool {
        self.is_code || self.content.contains("```")
    }

    /// Content with markdown fences removed, for handing to a code runner.
    pub fn code_body(&self) -> String {
        self.content
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Hosted-inference image model used until the user picks another.
pub fn default_image_model() -> String {
    MODEL_CATALOG
        .image
        .first()
        .map(|entry| entry.id.to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SessionState {
    history: Vec<ConversationTurn>,
    pub mode: BackendMode,
    pub configs: BackendConfigs,
    pub overlay: ModeOverlay,
    pub auto_model: bool,
    pub image_model: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(BackendConfigs::default())
    }
}

impl SessionState {
    pub fn new(configs: BackendConfigs) -> Self {
        Self {
            history: Vec::new(),
            mode: BackendMode::LocalRuntime,
            configs,
            overlay: ModeOverlay::default(),
            auto_model: true,
            image_model: default_image_model(),
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
    }

    pub fn active_config(&self) -> &BackendConfig {
        self.configs.get(self.mode)
    }

    pub fn export(&self) -> SessionExport {
        let params = self.active_config().params;
        SessionExport {
            messages: self.history.clone(),
            settings: ExportSettings {
                mode: self.mode,
                temperature: params.temperature,
                max_new_tokens: params.max_new_tokens,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub mode: BackendMode,
    pub temperature: f64,
    pub max_new_tokens: u32,
}

/// Downloadable snapshot: `{messages, settings: {mode, temperature, maxNewTokens}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub messages: Vec<ConversationTurn>,
    pub settings: ExportSettings,
}

pub fn export_session(state: &SessionState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&state.export())?)
}

pub fn parse_export(document: &str) -> Result<SessionExport> {
    Ok(serde_json::from_str(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SessionState {
        let mut state = SessionState::default();
        state.mode = BackendMode::Ollama;
        state.push(ConversationTurn::user("write a function to add numbers"));
        state.push(
            ConversationTurn::assistant("```rust\nfn add(a: i32, b: i32) -> i32 { a + b }\n```")
                .with_code_flag(true),
        );
        state.push(ConversationTurn::user("Analyze this image:").with_image("data:image/png;base64,AAAA"));
        state.push(ConversationTurn::assistant("[status: amber] Ollama returned no text."));
        state
    }

    #[test]
    fn export_round_trip_preserves_messages() {
        let state = sample_state();
        let document = export_session(&state).unwrap();
        let parsed = parse_export(&document).unwrap();
        assert_eq!(parsed.messages, state.history());
        assert_eq!(parsed.settings.mode, BackendMode::Ollama);
        assert_eq!(parsed.settings.max_new_tokens, 2048);
    }

    #[test]
    fn export_uses_console_field_names() {
        let document = export_session(&sample_state()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["settings"]["mode"], "ollama");
        assert!(value["settings"]["maxNewTokens"].is_u64());
        assert_eq!(value["messages"][1]["isCode"], true);
        assert!(value["messages"][0].get("isCode").is_none());
        assert!(value["messages"][2]["imageUrl"].is_string());
    }

    #[test]
    fn code_body_strips_fences() {
        let turn = ConversationTurn::assistant("```python\nprint('hi')\n```");
        assert!(turn.renders_as_code());
        assert_eq!(turn.code_body(), "print('hi')");
    }

    #[test]
    fn switching_mode_keeps_history() {
        let mut state = sample_state();
        let before = state.history().len();
        state.mode = BackendMode::Custom;
        assert_eq!(state.history().len(), before);
    }
}
