//! Version 1 of the session intent API.
//!
//! Every function is a thin wrapper that validates input, applies one user
//! intent to the shared session and returns a serialisable payload. The
//! session sits behind an async mutex, so overlapping submissions are applied
//! one after another in arrival order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::agents::config::{self, BackendConfigs, BackendMode, ConfigUpdate, ProviderInfo};
use crate::agents::AiOrchestrator;
use crate::dispatch::{can_dispatch, Dispatcher};
use crate::errors::Result;
use crate::logging::{EventLog, LogEvent};
use crate::prompt::ModeOverlay;
use crate::session::{self, ConversationTurn, SessionState};

/// Shared state handed to each intent handler.
#[derive(Clone)]
pub struct ApiState {
    pub session: Arc<Mutex<SessionState>>,
    pub dispatcher: Arc<Dispatcher>,
    pub events: Arc<EventLog>,
}

impl ApiState {
    pub fn new(configs: BackendConfigs) -> Result<Self> {
        Ok(Self::with_orchestrator(configs, AiOrchestrator::new()?))
    }

    pub fn with_orchestrator(configs: BackendConfigs, orchestrator: AiOrchestrator) -> Self {
        let events = Arc::new(EventLog::default());
        let dispatcher = Dispatcher::new(Arc::new(orchestrator), Arc::clone(&events));
        Self {
            session: Arc::new(Mutex::new(SessionState::new(configs))),
            dispatcher: Arc::new(dispatcher),
            events,
        }
    }

    fn audit(&self, message: &str, data: serde_json::Value) {
        self.events.log_event(
            "info",
            Some("BLX-0001"),
            "ai.settings",
            message,
            Some("Session configuration updated"),
            Some(data),
        );
    }
}

/// Health check for hosts.
pub fn ping() -> serde_json::Value {
    json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

pub const AUTO_MODEL: &str = "auto";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub messages: usize,
    pub mode: BackendMode,
    pub backend: String,
    /// Model the next text turn is sent to; `auto` while it is picked per task.
    pub model: String,
    /// Set only for the hosted inference backend, which also draws images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    pub overlay: ModeOverlay,
    pub auto_model: bool,
    pub ready: bool,
}

fn status_of(session: &SessionState) -> SessionStatus {
    let config = session.active_config();
    let hosted = session.mode == BackendMode::HuggingFace;
    let model = if hosted && session.auto_model {
        AUTO_MODEL.to_string()
    } else {
        config.model.clone()
    };
    SessionStatus {
        messages: session.history().len(),
        mode: session.mode,
        backend: session.mode.display_name().to_string(),
        model,
        image_model: hosted.then(|| session.image_model.clone()),
        overlay: session.overlay,
        auto_model: session.auto_model,
        ready: can_dispatch(session.mode, config),
    }
}

pub async fn status(state: &ApiState) -> SessionStatus {
    status_of(&*state.session.lock().await)
}

pub async fn history(state: &ApiState) -> Vec<ConversationTurn> {
    state.session.lock().await.history().to_vec()
}

pub async fn list_providers(state: &ApiState) -> Vec<ProviderInfo> {
    config::list_providers(&state.session.lock().await.configs)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTurnInput {
    pub text: String,
}

/// Run one user turn. Backend failures come back as status-marked turns;
/// only blank input is rejected.
pub async fn submit_turn(
    state: &ApiState,
    input: SubmitTurnInput,
) -> std::result::Result<ConversationTurn, String> {
    if input.text.trim().is_empty() {
        return Err("Nothing to send".to_string());
    }
    let mut session = state.session.lock().await;
    Ok(state.dispatcher.handle_turn(&mut session, &input.text).await)
}

pub async fn switch_mode(state: &ApiState, mode: BackendMode) -> SessionStatus {
    let mut session = state.session.lock().await;
    let previous = session.mode;
    session.mode = mode;
    state.audit(
        "Backend mode switched",
        json!({ "from": previous.id(), "to": mode.id() }),
    );
    status_of(&session)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfigInput {
    /// Defaults to the active mode.
    pub mode: Option<BackendMode>,
    #[serde(flatten)]
    pub update: ConfigUpdate,
}

pub async fn update_config(state: &ApiState, input: UpdateConfigInput) -> SessionStatus {
    let mut session = state.session.lock().await;
    let mode = input.mode.unwrap_or(session.mode);
    if !input.update.is_empty() {
        let touched_credential = input.update.credential.is_some();
        input.update.apply(session.configs.get_mut(mode));
        state.audit(
            "Backend configuration changed",
            json!({ "mode": mode.id(), "credential": touched_credential }),
        );
    }
    status_of(&session)
}

pub async fn select_overlay(state: &ApiState, overlay: ModeOverlay) -> SessionStatus {
    let mut session = state.session.lock().await;
    session.overlay = overlay;
    state.audit("Mode overlay selected", json!({ "overlay": overlay.id() }));
    status_of(&session)
}

pub async fn set_auto_model(state: &ApiState, enabled: bool) -> SessionStatus {
    let mut session = state.session.lock().await;
    session.auto_model = enabled;
    state.audit("Auto model toggled", json!({ "enabled": enabled }));
    status_of(&session)
}

/// Pick the hosted inference model used for image requests.
pub async fn set_image_model(
    state: &ApiState,
    model: &str,
) -> std::result::Result<SessionStatus, String> {
    let model = model.trim();
    if model.is_empty() {
        return Err("Image model is empty".to_string());
    }
    let mut session = state.session.lock().await;
    session.image_model = model.to_string();
    state.audit("Image model selected", json!({ "model": model }));
    Ok(status_of(&session))
}

/// Append an uploaded image as a user turn awaiting analysis.
pub async fn attach_image(
    state: &ApiState,
    image_url: &str,
) -> std::result::Result<ConversationTurn, String> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return Err("Image reference is empty".to_string());
    }
    let turn = ConversationTurn::user("Analyze this image:").with_image(image_url);
    state.session.lock().await.push(turn.clone());
    Ok(turn)
}

pub async fn analyze_image(state: &ApiState, prompt: &str) -> ConversationTurn {
    let mut session = state.session.lock().await;
    state.dispatcher.analyze_image(&mut session, prompt).await
}

/// Pretty JSON document `{messages, settings}` for download.
pub async fn export_session(state: &ApiState) -> std::result::Result<String, String> {
    let session = state.session.lock().await;
    session::export_session(&session).map_err(|e| e.to_string())
}

pub fn recent_events(state: &ApiState, limit: usize) -> Vec<LogEvent> {
    let events = state.events.snapshot();
    let skip = events.len().saturating_sub(limit);
    events.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn api() -> ApiState {
        ApiState::with_orchestrator(
            BackendConfigs::default(),
            AiOrchestrator::with_client(Client::new()),
        )
    }

    #[tokio::test]
    async fn blank_submission_is_rejected() {
        let api = api();
        let err = submit_turn(&api, SubmitTurnInput { text: "   ".into() })
            .await
            .unwrap_err();
        assert_eq!(err, "Nothing to send");
        assert_eq!(status(&api).await.messages, 0);
    }

    #[tokio::test]
    async fn readiness_follows_configuration() {
        let api = api();
        let status = switch_mode(&api, BackendMode::Custom).await;
        assert!(!status.ready);

        let status = update_config(
            &api,
            UpdateConfigInput {
                mode: None,
                update: ConfigUpdate {
                    endpoint: Some("http://localhost:9000/generate".into()),
                    ..Default::default()
                },
            },
        )
        .await;
        assert!(status.ready);
        assert_eq!(status.mode, BackendMode::Custom);
        let audits = recent_events(&api, 10);
        assert!(audits.iter().all(|e| e.code.as_deref() == Some("BLX-0001")));
        assert_eq!(audits.len(), 2);
    }

    #[tokio::test]
    async fn attached_image_without_router_is_reported() {
        let api = api();
        attach_image(&api, "data:image/png;base64,AAAA").await.unwrap();
        let turn = analyze_image(&api, "").await;
        assert!(turn.content.starts_with("[status: amber]"));
        assert!(turn.content.contains("requires OpenRouter"));
        assert_eq!(history(&api).await.len(), 2);
    }

    #[tokio::test]
    async fn update_config_input_deserializes_flattened_fields() {
        let input: UpdateConfigInput = serde_json::from_value(json!({
            "mode": "hf",
            "credential": "hf_abc",
            "maxNewTokens": 512
        }))
        .unwrap();
        let api = api();
        update_config(&api, input).await;
        let session = api.session.lock().await;
        let hf = session.configs.get(BackendMode::HuggingFace);
        assert_eq!(hf.credential.as_deref(), Some("hf_abc"));
        assert_eq!(hf.params.max_new_tokens, 512);
    }

    #[tokio::test]
    async fn export_contains_settings() {
        let api = api();
        select_overlay(&api, ModeOverlay::Surge).await;
        let document = export_session(&api).await.unwrap();
        let parsed = session::parse_export(&document).unwrap();
        assert_eq!(parsed.settings.mode, BackendMode::LocalRuntime);
        assert!(parsed.messages.is_empty());
    }

    #[tokio::test]
    async fn status_reports_the_model_a_turn_will_use() {
        let api = api();
        let status = switch_mode(&api, BackendMode::HuggingFace).await;
        assert_eq!(status.model, AUTO_MODEL);
        assert_eq!(
            status.image_model.as_deref(),
            Some("stabilityai/stable-diffusion-2-1")
        );

        set_auto_model(&api, false).await;
        let status = update_config(
            &api,
            UpdateConfigInput {
                mode: None,
                update: ConfigUpdate {
                    model: Some("my-org/my-model".into()),
                    ..Default::default()
                },
            },
        )
        .await;
        assert_eq!(status.model, "my-org/my-model");

        let status = switch_mode(&api, BackendMode::Ollama).await;
        assert_eq!(status.model, "llama3.1:8b");
        assert!(status.image_model.is_none());
    }

    #[tokio::test]
    async fn image_model_selection_rejects_blank() {
        let api = api();
        assert!(set_image_model(&api, "  ").await.is_err());
        switch_mode(&api, BackendMode::HuggingFace).await;
        let status = set_image_model(&api, " prompthero/openjourney ").await.unwrap();
        assert_eq!(status.image_model.as_deref(), Some("prompthero/openjourney"));
    }
}
