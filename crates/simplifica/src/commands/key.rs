//! Key command: store, show or clear the suggestion-service API key, or
//! answer a raw settings message.

use anyhow::Context;
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use simplifica_core::config::Config;
use simplifica_core::messaging::{Broker, FileStore, SettingsStore};

/// Arguments for the `key` subcommand.
#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Action to take.
    #[command(subcommand)]
    pub action: KeyAction,
}

/// Key actions.
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Validate and store a key
    Set {
        /// The key (starts with `sk-or-`).
        key: String,
    },
    /// Show the stored key, masked
    Show,
    /// Remove the stored key
    Clear,
    /// Answer one JSON settings message, e.g. '{"action":"getApiKey"}'
    Message {
        /// The message.
        #[arg(id = "message_json", value_name = "JSON")]
        json: String,
    },
}

#[derive(Serialize)]
struct KeyStatus {
    store: String,
    configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

/// The settings store selected by configuration.
pub fn settings_store(config: &Config) -> anyhow::Result<FileStore> {
    match config.settings_file {
        Some(ref path) => Ok(FileStore::new(path.clone())),
        None => FileStore::in_user_data_dir()
            .context("could not determine the user data directory; set settings_file"),
    }
}

/// The key in effect: the configured one, else the stored one.
pub fn resolve_api_key(config: &Config) -> anyhow::Result<Option<String>> {
    if let Some(key) = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(Some(key.to_string()));
    }
    let store = settings_store(config)?;
    Ok(store.load().context("failed to read stored API key")?.api_key)
}

/// Keep the prefix and the last four characters of a key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Manage the stored API key.
#[instrument(name = "cmd_key", skip_all)]
pub fn cmd_key(args: KeyArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    let store = settings_store(config)?;
    let store_path = store.path().to_string();
    debug!(store = %store_path, action = ?args.action, "executing key command");
    let mut broker = Broker::new(store);

    match args.action {
        KeyAction::Set { key } => {
            broker
                .update_api_key(&key)
                .with_context(|| format!("failed to store API key in {store_path}"))?;
            if !global_json {
                println!("{} API key stored in {store_path}", "Saved".green());
                return Ok(());
            }
        }
        KeyAction::Clear => {
            broker
                .clear_api_key()
                .with_context(|| format!("failed to clear API key in {store_path}"))?;
            if !global_json {
                println!("{} API key removed from {store_path}", "Cleared".green());
                return Ok(());
            }
        }
        KeyAction::Show => {}
        KeyAction::Message { json } => {
            println!("{}", broker.handle_json(&json));
            return Ok(());
        }
    }

    let key = broker.api_key().context("failed to read stored API key")?;
    let status = KeyStatus {
        store: store_path,
        configured: key.is_some(),
        key: key.as_deref().map(mask_key),
    };
    if global_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        match status.key {
            Some(ref masked) => println!("{}: {masked}", "API key".dimmed()),
            None => println!("{}: {}", "API key".dimmed(), "not configured".yellow()),
        }
        println!("{}: {}", "Store".dimmed(), status.store);
    }
    Ok(())
}
