pub mod adapters;
pub mod config;
pub mod orchestrator;
pub mod providers;

pub use config::{BackendConfig, BackendConfigs, BackendMode, ConfigUpdate, GenerationParams};
pub use orchestrator::{AiOrchestrator, ChatMessage, Generation, ImageRequest, TextRequest};
