//! Parsing of console input into user intents.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use blacklight_core::agents::{BackendMode, ConfigUpdate};
use blacklight_core::prompt::ModeOverlay;

#[derive(Debug, PartialEq)]
pub enum Command {
    Submit(String),
    Help,
    Status,
    Providers,
    Mode(BackendMode),
    Overlay(ModeOverlay),
    Set(ConfigField),
    AutoModel(bool),
    ImageModel(String),
    Attach(String),
    Analyze(String),
    Export(Option<PathBuf>),
    Events,
    Quit,
}

#[derive(Debug, PartialEq)]
pub enum ConfigField {
    Endpoint(String),
    Model(String),
    Token(String),
    Temperature(f64),
    MaxNewTokens(u32),
    TimeoutSecs(u64),
}

impl ConfigField {
    pub fn into_update(self) -> ConfigUpdate {
        let mut update = ConfigUpdate::default();
        match self {
            Self::Endpoint(v) => update.endpoint = Some(v),
            Self::Model(v) => update.model = Some(v),
            Self::Token(v) => update.credential = Some(v),
            Self::Temperature(v) => update.temperature = Some(v),
            Self::MaxNewTokens(v) => update.max_new_tokens = Some(v),
            Self::TimeoutSecs(v) => update.timeout_secs = Some(v),
        }
        update
    }
}

pub const HELP: &str = "\
Commands:
  /status                 session status
  /providers              list backends
  /mode <id>              webllm | ollama | a1111 | openrouter | hf | custom
  /overlay <id>           truth | phantom | surge
  /set <key> <value>      endpoint | model | token | temperature | max | timeout
  /auto on|off            automatic model routing
  /image-model <id>       hosted image model
  /attach <url|path>      attach an image for analysis
  /analyze [prompt]       analyse the last attached image
  /export [path]          write the session JSON
  /events                 recent diagnostics
  /quit                   leave
Anything else is sent as a message.";

pub fn parse(line: &str) -> Result<Command> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Submit(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "help" | "?" => Command::Help,
        "status" => Command::Status,
        "providers" => Command::Providers,
        "mode" => Command::Mode(arg.parse()?),
        "overlay" => Command::Overlay(arg.parse()?),
        "set" => Command::Set(parse_field(arg)?),
        "auto" => Command::AutoModel(parse_switch(arg)?),
        "image-model" if !arg.is_empty() => Command::ImageModel(arg.to_string()),
        "image-model" => bail!("usage: /image-model <id>"),
        "attach" if !arg.is_empty() => Command::Attach(arg.to_string()),
        "attach" => bail!("usage: /attach <url|path>"),
        "analyze" => Command::Analyze(arg.to_string()),
        "export" => Command::Export((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "events" => Command::Events,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command /{other}; try /help"),
    };
    Ok(command)
}

fn parse_field(arg: &str) -> Result<ConfigField> {
    let (key, value) = arg
        .split_once(char::is_whitespace)
        .map(|(k, v)| (k, v.trim()))
        .unwrap_or((arg, ""));
    let field = match key {
        "endpoint" | "url" => ConfigField::Endpoint(value.to_string()),
        "model" => ConfigField::Model(value.to_string()),
        "token" | "key" => ConfigField::Token(value.to_string()),
        "temperature" | "temp" => ConfigField::Temperature(value.parse()?),
        "max" | "max_new_tokens" => ConfigField::MaxNewTokens(value.parse()?),
        "timeout" => ConfigField::TimeoutSecs(value.parse()?),
        "" => bail!("usage: /set <key> <value>"),
        other => return Err(anyhow!("unknown setting {other}")),
    };
    Ok(field)
}

fn parse_switch(arg: &str) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => bail!("usage: /auto on|off"),
    }
}
