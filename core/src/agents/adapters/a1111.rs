use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{apply_timeout, send_json, ImageAdapter};
use crate::agents::config::BackendConfig;
use crate::agents::orchestrator::ImageRequest;
use crate::errors::{BlacklightError, Result};

const DEFAULT_STEPS: u32 = 25;
const DEFAULT_WIDTH: u32 = 768;
const DEFAULT_HEIGHT: u32 = 512;

/// Automatic1111 txt2img. Image generation only.
pub struct Automatic1111Adapter {
    client: Client,
}

impl Automatic1111Adapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn first_image(body: &Value) -> Option<String> {
    body.get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(Value::as_str)
        .filter(|b64| !b64.is_empty())
        .map(|b64| format!("data:image/png;base64,{b64}"))
}

#[async_trait]
impl ImageAdapter for Automatic1111Adapter {
    async fn generate(
        &self,
        request: &ImageRequest,
        config: &BackendConfig,
    ) -> Result<Option<String>> {
        if !config.has_endpoint() {
            return Err(BlacklightError::config("A1111 endpoint is not configured"));
        }
        let url = format!("{}/sdapi/v1/txt2img", config.base_url());
        let payload = json!({
            "prompt": request.prompt,
            "negative_prompt": "",
            "steps": DEFAULT_STEPS,
            "width": DEFAULT_WIDTH,
            "height": DEFAULT_HEIGHT,
        });
        let body = send_json(
            apply_timeout(self.client.post(url), config).json(&payload),
            "A1111",
        )
        .await?;
        Ok(first_image(&body))
    }
}
