mod commands;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use blacklight_core::agents::{BackendConfigs, BackendMode, ConfigUpdate};
use blacklight_core::api::v1::{self, ApiState, SubmitTurnInput, UpdateConfigInput};
use blacklight_core::prompt::ModeOverlay;
use blacklight_core::session::EXPORT_FILE_NAME;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use commands::Command;

/// Terminal host for the BLACKLIGHT assistant.
#[derive(Debug, Parser)]
#[command(name = "blacklight", version, about)]
struct Cli {
    /// Backend to start with.
    #[arg(long, default_value = "webllm")]
    mode: BackendMode,
    /// Persona overlay.
    #[arg(long, default_value = "truth")]
    overlay: ModeOverlay,
    /// Endpoint override for the starting backend.
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// API token for the starting backend.
    #[arg(long, env = "BLACKLIGHT_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    max_new_tokens: Option<u32>,
    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Use the configured model instead of routing by task.
    #[arg(long)]
    no_auto_model: bool,
}

impl Cli {
    fn config_update(&self) -> ConfigUpdate {
        ConfigUpdate {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            credential: self.token.clone(),
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiState::new(BackendConfigs::from_env())?;

    v1::switch_mode(&api, cli.mode).await;
    v1::update_config(
        &api,
        UpdateConfigInput {
            mode: Some(cli.mode),
            update: cli.config_update(),
        },
    )
    .await;
    v1::select_overlay(&api, cli.overlay).await;
    v1::set_auto_model(&api, !cli.no_auto_model).await;
    tracing::info!(mode = %cli.mode, overlay = cli.overlay.id(), "session ready");

    println!("BLACKLIGHT online. /help for commands.");
    println!("{}", render::status(&v1::status(&api).await));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match commands::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(err) = run(&api, command).await {
                    eprintln!("error: {err:#}");
                }
            }
            Err(err) => eprintln!("error: {err:#}"),
        }
    }
    Ok(())
}

async fn run(api: &ApiState, command: Command) -> Result<()> {
    match command {
        Command::Submit(text) => {
            let status = v1::status(api).await;
            if !status.ready {
                println!(
                    "{} is not configured; use /set or /mode first.",
                    status.backend
                );
                return Ok(());
            }
            let reply = v1::submit_turn(api, SubmitTurnInput { text })
                .await
                .map_err(anyhow::Error::msg)?;
            println!("{}", render::turn(&reply));
        }
        Command::Help => println!("{}", commands::HELP),
        Command::Status => println!("{}", render::status(&v1::status(api).await)),
        Command::Providers => println!("{}", render::providers(&v1::list_providers(api).await)),
        Command::Mode(mode) => println!("{}", render::status(&v1::switch_mode(api, mode).await)),
        Command::Overlay(overlay) => {
            println!("{}", render::status(&v1::select_overlay(api, overlay).await))
        }
        Command::Set(field) => {
            let status = v1::update_config(
                api,
                UpdateConfigInput {
                    mode: None,
                    update: field.into_update(),
                },
            )
            .await;
            println!("{}", render::status(&status));
        }
        Command::AutoModel(enabled) => {
            println!("{}", render::status(&v1::set_auto_model(api, enabled).await))
        }
        Command::ImageModel(model) => {
            let status = v1::set_image_model(api, &model)
                .await
                .map_err(anyhow::Error::msg)?;
            println!("{}", render::status(&status));
        }
        Command::Attach(reference) => {
            let url = render::image_reference(&reference).await?;
            let turn = v1::attach_image(api, &url)
                .await
                .map_err(anyhow::Error::msg)?;
            println!("{}", render::turn(&turn));
        }
        Command::Analyze(prompt) => {
            let reply = v1::analyze_image(api, &prompt).await;
            println!("{}", render::turn(&reply));
        }
        Command::Export(path) => {
            let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            let document = v1::export_session(api)
                .await
                .map_err(anyhow::Error::msg)?;
            tokio::fs::write(&path, document).await?;
            println!("session written to {}", path.display());
        }
        Command::Events => {
            for event in v1::recent_events(api, 20) {
                println!("{}", render::event(&event));
            }
        }
        Command::Quit => {}
    }
    Ok(())
}
