//! Terminal rendering of turns, status and diagnostics.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blacklight_core::agents::config::ProviderInfo;
use blacklight_core::api::v1::SessionStatus;
use blacklight_core::logging::LogEvent;
use blacklight_core::session::{ConversationTurn, Role};

const IMAGE_PREVIEW: usize = 64;

pub fn turn(turn: &ConversationTurn) -> String {
    let speaker = match turn.role {
        Role::User => "you",
        Role::Assistant => "BLX",
    };
    let mut out = format!("{speaker} > ");
    if turn.renders_as_code() {
        out.push_str("[code]\n");
        out.push_str(&turn.code_body());
    } else {
        out.push_str(&turn.content);
    }
    if let Some(url) = &turn.image_url {
        out.push_str("\n  image: ");
        out.push_str(&preview(url));
    }
    out
}

fn preview(url: &str) -> String {
    if url.len() <= IMAGE_PREVIEW {
        return url.to_string();
    }
    let cut = (0..=IMAGE_PREVIEW)
        .rev()
        .find(|i| url.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}… ({} bytes)", &url[..cut], url.len())
}

pub fn status(status: &SessionStatus) -> String {
    let mut line = format!(
        "backend {} [{}] model {}",
        status.backend,
        status.mode,
        if status.model.is_empty() { "-" } else { status.model.as_str() },
    );
    if let Some(image_model) = &status.image_model {
        line.push_str(&format!(" image {image_model}"));
    }
    line.push_str(&format!(
        " | overlay {} | auto-model {} | {} messages | {}",
        status.overlay.id(),
        if status.auto_model { "on" } else { "off" },
        status.messages,
        if status.ready { "ready" } else { "not configured" },
    ));
    line
}

pub fn providers(providers: &[ProviderInfo]) -> String {
    providers
        .iter()
        .map(|p| {
            format!(
                "{:<11} {:<14} {}{}",
                p.mode.id(),
                p.display_name,
                p.description,
                if p.requires_api_key && !p.has_credentials {
                    " (key missing)"
                } else {
                    ""
                }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn event(event: &LogEvent) -> String {
    format!(
        "{} {:<5} {} {} {}",
        event.ts,
        event.level,
        event.code.as_deref().unwrap_or("-"),
        event.module,
        event.message
    )
}

/// Remote references pass through; local files become data URLs.
pub async fn image_reference(reference: &str) -> anyhow::Result<String> {
    if ["http://", "https://", "data:"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
    {
        return Ok(reference.to_string());
    }
    let bytes = tokio::fs::read(reference).await?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for(Path::new(reference)),
        STANDARD.encode(bytes)
    ))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_image_urls_are_shortened() {
        let url = format!("data:image/png;base64,{}", "A".repeat(500));
        let shown = preview(&url);
        assert!(shown.starts_with("data:image/png;base64,"));
        assert!(shown.ends_with(&format!("({} bytes)", url.len())));
    }

    #[test]
    fn code_turns_drop_fences() {
        let t = ConversationTurn::assistant("```rust\nfn main() {}\n```").with_code_flag(true);
        assert_eq!(turn(&t), "BLX > [code]\nfn main() {}");
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a")), "image/png");
    }

    #[tokio::test]
    async fn remote_references_pass_through() {
        let url = "https://example.com/cat.png";
        assert_eq!(image_reference(url).await.unwrap(), url);
    }
}
