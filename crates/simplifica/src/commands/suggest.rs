//! Suggest command: ask the language model for simpler rewrites.

use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use simplifica_core::config::Config;
use simplifica_core::menu::{LOADING_MESSAGE, PanelContent};
use simplifica_core::readability::{self, ReadabilityResult};
use simplifica_core::suggest::SuggestionClient;

use super::key::resolve_api_key;

/// Arguments for the `suggest` subcommand.
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// The sentence to rewrite.
    pub sentence: String,

    /// Override the configured model.
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Serialize)]
struct SuggestReport<'a> {
    original: &'a str,
    readability: Option<ReadabilityResult>,
    #[serde(flatten)]
    content: &'a PanelContent,
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(LOADING_MESSAGE);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Request rewrites of one sentence and print them with their scores.
#[instrument(name = "cmd_suggest", skip_all, fields(sentence_len = args.sentence.len()))]
pub async fn cmd_suggest(args: SuggestArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    let sentence = args.sentence.trim();
    if sentence.is_empty() {
        bail!("nothing to rewrite: the sentence is empty");
    }

    let mut config = config.clone();
    if let Some(model) = args.model {
        config.model = model;
    }
    debug!(model = %config.model, endpoint = %config.endpoint, "executing suggest command");

    let api_key = resolve_api_key(&config)?;
    let client = SuggestionClient::new(&config).context("failed to build HTTP client")?;

    let pb = spinner(global_json);
    let result = client.suggest(api_key.as_deref(), sentence).await;
    pb.finish_and_clear();

    let content = PanelContent::from_result(result);
    let original = readability::score(sentence);

    if global_json {
        let report = SuggestReport {
            original: sentence,
            readability: original,
            content: &content,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &content {
            PanelContent::Suggestions { items } => {
                if let Some(ref r) = original {
                    println!("{} {} (Flesch: {:.0})", "Original:".dimmed(), sentence, r.score);
                }
                for (i, item) in items.iter().enumerate() {
                    let score = item
                        .readability
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |r| format!("{:.0}", r.score));
                    println!("{}. {} {}", i + 1, item.text, format!("(Flesch: {score})").green());
                }
            }
            PanelContent::Error { message } => bail!("{message}"),
            other => {
                let message = other.message().unwrap_or_default();
                if matches!(other, PanelContent::MissingKey) {
                    bail!("{message}");
                }
                println!("{message}");
            }
        }
    }

    Ok(())
}
