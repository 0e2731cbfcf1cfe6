//! Per-turn dispatch with a single recovery boundary.
//!
//! `Dispatcher::handle_turn` classifies the input, composes the prompt, calls
//! the adapter of the active mode and always resolves to a displayable
//! assistant turn. Adapter failures become status-marked turns; nothing
//! raised below this boundary reaches the caller.

use std::sync::Arc;

use serde_json::json;

use crate::agents::config::{BackendConfig, BackendMode};
use crate::agents::{AiOrchestrator, Generation, ImageRequest, TextRequest};
use crate::errors::{BlacklightError, Result};
use crate::logging::EventLog;
use crate::prompt::compose_prompt;
use crate::selector::{classify_task, is_image_request, select_model, TaskCategory, MODEL_CATALOG};
use crate::session::{ConversationTurn, Role, SessionState};

pub const STATUS_COMPLETE: &str = "[status: complete]";
pub const STATUS_AMBER: &str = "[status: amber]";
pub const STATUS_ERROR: &str = "[error]";

const MODULE: &str = "ai.dispatch";

/// Lifecycle of a single turn once input arrives. `Completed` and
/// `FailedDisplayed` are terminal for the turn only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Classifying,
    Composing,
    AwaitingBackend,
    Completed,
    FailedDisplayed,
}

/// Whether `mode` has the minimum configuration needed to attempt a call.
pub fn can_dispatch(mode: BackendMode, config: &BackendConfig) -> bool {
    let has_model = !config.model.trim().is_empty();
    match mode {
        BackendMode::LocalRuntime => has_model,
        BackendMode::Ollama => config.has_endpoint() && has_model,
        BackendMode::Automatic1111 => config.has_endpoint(),
        BackendMode::OpenRouter => config.has_credential(),
        BackendMode::HuggingFace => config.has_credential(),
        BackendMode::Custom => config.has_endpoint(),
    }
}

pub struct Dispatcher {
    orchestrator: Arc<AiOrchestrator>,
    events: Arc<EventLog>,
}

impl Dispatcher {
    pub fn new(orchestrator: Arc<AiOrchestrator>, events: Arc<EventLog>) -> Self {
        Self {
            orchestrator,
            events,
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run one user turn. The user turn and the resulting assistant turn are
    /// appended to `state` only after the backend call resolves.
    pub async fn handle_turn(&self, state: &mut SessionState, input: &str) -> ConversationTurn {
        let input = input.trim();
        let user_turn = ConversationTurn::user(input);
        let mode = state.mode;
        let config = state.configs.get(mode).clone();

        trace_phase(TurnPhase::Classifying, mode);
        let category = classify_task(input);
        let wants_image = is_image_request(input, category);

        let (assistant, phase) = if wants_image && mode.is_image_capable() {
            trace_phase(TurnPhase::AwaitingBackend, mode);
            let request = ImageRequest {
                prompt: input.to_string(),
                model: Some(state.image_model.clone()),
            };
            match self.generate_image(mode, &request, &config).await {
                Ok(url) => {
                    self.log_success(mode, request.model.as_deref().unwrap_or_default(), "image");
                    (
                        ConversationTurn::assistant(image_notice(mode)).with_image(url),
                        TurnPhase::Completed,
                    )
                }
                Err(err) => {
                    self.log_failure(mode, request.model.as_deref().unwrap_or_default(), &err);
                    (
                        ConversationTurn::assistant(format!("{STATUS_ERROR} {err}")),
                        TurnPhase::FailedDisplayed,
                    )
                }
            }
        } else {
            trace_phase(TurnPhase::Composing, mode);
            let mut with_user = state.history().to_vec();
            with_user.push(user_turn.clone());
            let request = TextRequest {
                prompt: compose_prompt(&with_user, category, state.overlay),
                prior: state.history().to_vec(),
                model: routed_model(state, category),
            };
            let model = request.model(&config).to_string();

            trace_phase(TurnPhase::AwaitingBackend, mode);
            match self.orchestrator.send(mode, &request, &config).await {
                Ok(Generation::Text(text)) => {
                    self.log_success(mode, &model, &text);
                    (
                        ConversationTurn::assistant(text)
                            .with_code_flag(category == TaskCategory::Code),
                        TurnPhase::Completed,
                    )
                }
                Ok(Generation::Empty) => {
                    let notice = self.orchestrator.empty_notice(mode);
                    self.log_success(mode, &model, notice);
                    (
                        ConversationTurn::assistant(format!("{STATUS_AMBER} {notice}")),
                        TurnPhase::Completed,
                    )
                }
                Err(err) => {
                    self.log_failure(mode, &model, &err);
                    (
                        ConversationTurn::assistant(format!("{STATUS_AMBER} {err}")),
                        TurnPhase::FailedDisplayed,
                    )
                }
            }
        };

        trace_phase(phase, mode);
        state.push(user_turn);
        state.push(assistant.clone());
        assistant
    }

    /// Analyse the most recent image the user attached. Hosted router only.
    pub async fn analyze_image(&self, state: &mut SessionState, prompt: &str) -> ConversationTurn {
        let mode = state.mode;
        let config = state.configs.get(mode).clone();
        let image_url = state
            .history()
            .iter()
            .rev()
            .find(|turn| turn.is_image() && turn.role == Role::User)
            .and_then(|turn| turn.image_url.clone());

        let assistant = match image_url {
            None => ConversationTurn::assistant(format!(
                "{STATUS_AMBER} No image attached to analyze."
            )),
            Some(url) => match self
                .orchestrator
                .analyze_image(mode, prompt, &url, &config)
                .await
            {
                Ok(Generation::Text(text)) => {
                    self.log_success(mode, &config.model, &text);
                    ConversationTurn::assistant(text)
                }
                Ok(Generation::Empty) => ConversationTurn::assistant(format!(
                    "{STATUS_AMBER} {}",
                    self.orchestrator.empty_notice(mode)
                )),
                Err(err) => {
                    self.log_failure(mode, &config.model, &err);
                    ConversationTurn::assistant(format!("{STATUS_AMBER} {err}"))
                }
            },
        };
        state.push(assistant.clone());
        assistant
    }

    async fn generate_image(
        &self,
        mode: BackendMode,
        request: &ImageRequest,
        config: &BackendConfig,
    ) -> Result<String> {
        self.orchestrator
            .generate_image(mode, request, config)
            .await?
            .ok_or_else(|| {
                BlacklightError::backend(
                    None,
                    format!("{} did not return an image", self.orchestrator.label(mode)),
                )
            })
    }

    fn log_success(&self, mode: BackendMode, model: &str, output: &str) {
        let preview = output.chars().take(200).collect::<String>();
        self.events.log_event(
            "info",
            Some("BLX-0200"),
            MODULE,
            "Backend call succeeded",
            Some("Dispatcher resolved the active backend"),
            Some(json!({
                "provider": mode.id(),
                "model": model,
                "preview": preview,
            })),
        );
    }

    fn log_failure(&self, mode: BackendMode, model: &str, error: &BlacklightError) {
        self.events.log_event(
            "warn",
            Some("BLX-0201"),
            MODULE,
            "Backend call failed",
            Some(error.explain()),
            Some(json!({
                "provider": mode.id(),
                "model": model,
                "code": error.code(),
                "status": error.status(),
                "error": error.to_string(),
            })),
        );
    }
}

/// Model override for adapters that route per task. Only the hosted
/// inference backend serves catalog models, and only while auto routing is
/// on; otherwise the configured model of the mode is used.
pub fn routed_model(state: &SessionState, category: TaskCategory) -> Option<String> {
    if state.mode != BackendMode::HuggingFace || !state.auto_model {
        return None;
    }
    select_model(category, &MODEL_CATALOG.text_model_ids()).map(str::to_string)
}

fn image_notice(mode: BackendMode) -> String {
    match mode {
        BackendMode::Automatic1111 => format!("{STATUS_COMPLETE} Image generated (A1111)."),
        _ => format!("{STATUS_COMPLETE} Image generated successfully."),
    }
}

fn trace_phase(phase: TurnPhase, mode: BackendMode) {
    log::debug!(target: "blacklight", "turn phase {phase:?} ({mode})");
}
