//! Prompt assembly for text backends.
//!
//! `compose_prompt` is pure: persona preamble, behavioural overlay, task
//! block, rendered history and the trailing assistant cue, in that order.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agents::ChatMessage;
use crate::errors::BlacklightError;
use crate::selector::TaskCategory;
use crate::session::{ConversationTurn, Role};

pub const PERSONA_PREAMBLE: &str = "You are BLACKLIGHT NEXT — an advanced multi-modal AI operations system.

CAPABILITIES:
- Text generation and analysis
- Code generation, debugging, and execution
- Image analysis and generation
- Voice synthesis and recognition
- Real-time collaboration

PERSONALITY:
- Hyper-competent and precise
- Minimal, clean communication style
- Status indicators: [trace], [resolve], [executing], [complete]
- Technical but accessible explanations

ETHICS:
- Refuse illegal, harmful, or privacy-invasive requests
- Provide safe, educational alternatives
- Maintain user privacy and data security
- Follow responsible AI principles

FORMAT RESPONSES with appropriate status indicators and clean structure.";

pub const ASSISTANT_CUE: &str = "Assistant:";

const CODE_BLOCK: &str = "SPECIAL MODE: CODE GENERATION
- Provide complete, functional code
- Include error handling
- Add clear comments
- Suggest testing approaches";

const IMAGE_BLOCK: &str = "SPECIAL MODE: IMAGE GENERATION
- Create detailed, artistic descriptions
- Consider composition, lighting, style
- Optimize prompts for visual models";

/// System line prepended for the local chat-completion runtime.
pub const RUNTIME_SYSTEM_LINE: &str = "You are BLACKLIGHT: concise, precise.";
/// System line prepended for the hosted router.
pub const ROUTER_SYSTEM_LINE: &str = "You are BLACKLIGHT, a concise, helpful AI.";

/// Named stylistic preset layered over the persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeOverlay {
    #[default]
    Truth,
    Phantom,
    Surge,
}

impl ModeOverlay {
    pub const ALL: [ModeOverlay; 3] = [ModeOverlay::Truth, ModeOverlay::Phantom, ModeOverlay::Surge];

    pub fn id(self) -> &'static str {
        match self {
            Self::Truth => "truth",
            Self::Phantom => "phantom",
            Self::Surge => "surge",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Self::Truth => "clinical analysis",
            Self::Phantom => "encrypted metaphors",
            Self::Surge => "high-bandwidth output",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Truth => "MODE: TRUTH\nYou are BLACKLIGHT, an AI designed for clinical, direct, and unsparing analysis. Avoid metaphors or flowery language.",
            Self::Phantom => "MODE: PHANTOM\nYou are BLACKLIGHT, an AI designed for encrypted and metaphorical communication. Use abstract and poetic language.",
            Self::Surge => "MODE: SURGE\nYou are BLACKLIGHT, an AI designed for high-bandwidth, concise output. Respond in short, rapid-fire bursts.",
        }
    }
}

impl FromStr for ModeOverlay {
    type Err = BlacklightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ModeOverlay::ALL
            .into_iter()
            .find(|overlay| overlay.id() == needle)
            .ok_or_else(|| BlacklightError::config(format!("Unknown mode overlay: {s}")))
    }
}

fn task_block(category: TaskCategory) -> Option<&'static str> {
    match category {
        TaskCategory::Code => Some(CODE_BLOCK),
        TaskCategory::Image => Some(IMAGE_BLOCK),
        TaskCategory::Analysis | TaskCategory::Conversation => None,
    }
}

pub fn system_prompt(category: TaskCategory, overlay: ModeOverlay) -> String {
    let mut system = String::from(PERSONA_PREAMBLE);
    system.push_str("\n\n");
    system.push_str(overlay.instruction());
    if let Some(block) = task_block(category) {
        system.push_str("\n\n");
        system.push_str(block);
    }
    system
}

pub fn compose_prompt(
    history: &[ConversationTurn],
    category: TaskCategory,
    overlay: ModeOverlay,
) -> String {
    let mut out = format!("System: {}\n\n", system_prompt(category, overlay));
    for turn in history {
        let label = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        // Writing into a String cannot fail.
        let _ = write!(out, "{label}: {}\n\n", turn.content);
    }
    out.push_str(ASSISTANT_CUE);
    out
}

/// Chat framing for chat-completion backends: a system line, the prior
/// history, then the composed prompt as the final user message.
pub fn chat_messages(
    system_line: &str,
    prior: &[ConversationTurn],
    composed: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(prior.len() + 2);
    messages.push(ChatMessage::system(system_line));
    messages.extend(
        prior
            .iter()
            .map(|turn| ChatMessage::new(turn.role.as_str(), turn.content.clone())),
    );
    messages.push(ChatMessage::user(composed));
    messages
}
