//! Keyword task classification and model ranking.
//!
//! Both functions are total: classification always yields a category and
//! selection always yields a model whenever the candidate list is non-empty.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Code,
    Image,
    Analysis,
    Conversation,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Image => "image",
            Self::Analysis => "analysis",
            Self::Conversation => "conversation",
        }
    }
}

const CODE_MARKERS: &[&str] = &["code", "program", "function", "```"];
const IMAGE_MARKERS: &[&str] = &["image", "picture", "draw", "generate visual"];
const ANALYSIS_MARKERS: &[&str] = &["analyze", "explain", "what is"];
const IMAGE_REQUEST_PHRASE: &str = "generate image";

/// First matching category wins: code, then image, then analysis.
pub fn classify_task(text: &str) -> TaskCategory {
    let lower = text.to_lowercase();
    let mentions = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if mentions(CODE_MARKERS) {
        TaskCategory::Code
    } else if mentions(IMAGE_MARKERS) {
        TaskCategory::Image
    } else if mentions(ANALYSIS_MARKERS) {
        TaskCategory::Analysis
    } else {
        TaskCategory::Conversation
    }
}

/// Whether a turn should be routed to an image adapter.
pub fn is_image_request(text: &str, category: TaskCategory) -> bool {
    category == TaskCategory::Image || text.to_lowercase().contains(IMAGE_REQUEST_PHRASE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelParams {
    Text {
        max_tokens: u32,
        temperature: f64,
    },
    Image {
        guidance_scale: f64,
        num_inference_steps: u32,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub kind: &'static str,
    pub params: ModelParams,
}

/// Immutable model table and per-category preference ranking.
pub struct ModelCatalog {
    pub text: &'static [CatalogEntry],
    pub image: &'static [CatalogEntry],
}

pub const MODEL_CATALOG: ModelCatalog = ModelCatalog {
    text: &[
        CatalogEntry {
            id: "mistralai/Mistral-7B-Instruct-v0.3",
            kind: "text",
            params: ModelParams::Text {
                max_tokens: 4096,
                temperature: 0.7,
            },
        },
        CatalogEntry {
            id: "microsoft/DialoGPT-large",
            kind: "conversation",
            params: ModelParams::Text {
                max_tokens: 2048,
                temperature: 0.8,
            },
        },
        CatalogEntry {
            id: "codellama/CodeLlama-7b-Python-hf",
            kind: "code",
            params: ModelParams::Text {
                max_tokens: 8192,
                temperature: 0.1,
            },
        },
        CatalogEntry {
            id: "bigcode/starcoder",
            kind: "code",
            params: ModelParams::Text {
                max_tokens: 8192,
                temperature: 0.1,
            },
        },
    ],
    image: &[
        CatalogEntry {
            id: "stabilityai/stable-diffusion-2-1",
            kind: "image",
            params: ModelParams::Image {
                guidance_scale: 7.5,
                num_inference_steps: 50,
            },
        },
        CatalogEntry {
            id: "runwayml/stable-diffusion-v1-5",
            kind: "image",
            params: ModelParams::Image {
                guidance_scale: 7.5,
                num_inference_steps: 50,
            },
        },
        CatalogEntry {
            id: "prompthero/openjourney",
            kind: "image",
            params: ModelParams::Image {
                guidance_scale: 7.0,
                num_inference_steps: 25,
            },
        },
    ],
};

const CODE_PREFERENCES: &[&str] = &["codellama/CodeLlama-7b-Python-hf", "bigcode/starcoder"];
const IMAGE_PREFERENCES: &[&str] = &[
    "stabilityai/stable-diffusion-2-1",
    "runwayml/stable-diffusion-v1-5",
];
const CONVERSATION_PREFERENCES: &[&str] = &[
    "microsoft/DialoGPT-large",
    "mistralai/Mistral-7B-Instruct-v0.3",
];
const DEFAULT_PREFERENCES: &[&str] = &["mistralai/Mistral-7B-Instruct-v0.3"];

impl ModelCatalog {
    pub fn preferences(&self, category: TaskCategory) -> &'static [&'static str] {
        match category {
            TaskCategory::Code => CODE_PREFERENCES,
            TaskCategory::Image => IMAGE_PREFERENCES,
            TaskCategory::Conversation => CONVERSATION_PREFERENCES,
            TaskCategory::Analysis => DEFAULT_PREFERENCES,
        }
    }

    pub fn text_model_ids(&self) -> Vec<&'static str> {
        self.text.iter().map(|entry| entry.id).collect()
    }

    pub fn lookup(&self, model_id: &str) -> Option<&CatalogEntry> {
        self.text
            .iter()
            .chain(self.image.iter())
            .find(|entry| entry.id == model_id)
    }

    /// JSON `parameters` object for an image model; empty for unknown ids.
    pub fn image_parameters(&self, model_id: &str) -> serde_json::Value {
        match self.lookup(model_id).map(|entry| entry.params) {
            Some(ModelParams::Image {
                guidance_scale,
                num_inference_steps,
            }) => serde_json::json!({
                "guidance_scale": guidance_scale,
                "num_inference_steps": num_inference_steps,
            }),
            _ => serde_json::json!({}),
        }
    }
}

/// Highest-ranked preferred model that is available, else the first
/// available one. `None` only when nothing is available.
pub fn select_model<'a, S: AsRef<str>>(category: TaskCategory, available: &'a [S]) -> Option<&'a str> {
    MODEL_CATALOG
        .preferences(category)
        .iter()
        .find_map(|preferred| {
            available
                .iter()
                .map(AsRef::as_ref)
                .find(|id| id == preferred)
        })
        .or_else(|| available.first().map(AsRef::as_ref))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_representative_inputs() {
        assert_eq!(classify_task("write a function to sort a list"), TaskCategory::Code);
        assert_eq!(classify_task("draw a sunset over mountains"), TaskCategory::Image);
        assert_eq!(classify_task("what is entropy"), TaskCategory::Analysis);
        assert_eq!(classify_task("hey, how's it going"), TaskCategory::Conversation);
    }

    #[test]
    fn code_outranks_image_and_analysis() {
        assert_eq!(
            classify_task("Explain the code that draws this picture"),
            TaskCategory::Code
        );
        assert_eq!(classify_task("explain this picture"), TaskCategory::Image);
        assert_eq!(classify_task("```\nfn main() {}\n```"), TaskCategory::Code);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify_task("ANALYZE my results"), TaskCategory::Analysis);
    }

    #[test]
    fn image_request_phrase_is_recognised() {
        let text = "please generate image of a cat";
        assert!(is_image_request(text, classify_task(text)));
        assert!(!is_image_request("tell me a joke", TaskCategory::Conversation));
    }

    #[test]
    fn select_model_prefers_ranked_entry() {
        let available = MODEL_CATALOG.text_model_ids();
        assert_eq!(
            select_model(TaskCategory::Code, &available),
            Some("codellama/CodeLlama-7b-Python-hf")
        );
        assert_eq!(
            select_model(TaskCategory::Conversation, &available),
            Some("microsoft/DialoGPT-large")
        );
        assert_eq!(
            select_model(TaskCategory::Analysis, &available),
            Some("mistralai/Mistral-7B-Instruct-v0.3")
        );
    }

    #[test]
    fn select_model_falls_back_to_first_available() {
        let available = vec!["local/tiny".to_string(), "local/other".to_string()];
        assert_eq!(select_model(TaskCategory::Code, &available), Some("local/tiny"));
    }

    #[test]
    fn select_model_always_returns_an_available_model() {
        let pools: Vec<Vec<&str>> = vec![
            vec!["bigcode/starcoder"],
            vec!["x", "microsoft/DialoGPT-large"],
            vec!["runwayml/stable-diffusion-v1-5", "y"],
            MODEL_CATALOG.text_model_ids(),
        ];
        let categories = [
            TaskCategory::Code,
            TaskCategory::Image,
            TaskCategory::Analysis,
            TaskCategory::Conversation,
        ];
        for pool in &pools {
            for category in categories {
                let picked = select_model(category, pool).unwrap();
                assert!(pool.contains(&picked));
            }
        }
        let empty: [&str; 0] = [];
        assert_eq!(select_model(TaskCategory::Code, &empty), None);
    }

    #[test]
    fn image_parameters_come_from_catalog() {
        let params = MODEL_CATALOG.image_parameters("prompthero/openjourney");
        assert_eq!(params["num_inference_steps"], 25);
        assert_eq!(MODEL_CATALOG.image_parameters("unknown"), serde_json::json!({}));
    }
}
