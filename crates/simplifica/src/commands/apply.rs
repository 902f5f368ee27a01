//! Apply command: replace one sentence in a file through the same edit path
//! an accepted suggestion takes in an editor.

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use simplifica_core::config::Config;
use simplifica_core::markdown::form_field_from_text;
use simplifica_core::orchestrator::{AnalysisContext, OrchestratorSettings};
use simplifica_core::surface::ReplaceStrategy;
use simplifica_core::tree::LayoutMetrics;

use super::read_input_file;

/// Arguments for the `apply` subcommand.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// File to edit.
    pub file: Utf8PathBuf,

    /// Sentence to replace, verbatim.
    #[arg(long)]
    pub old: String,

    /// Replacement sentence.
    #[arg(long)]
    pub new: String,

    /// Write the result back to the file instead of printing it.
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
struct ApplyReport {
    file: String,
    strategy: ReplaceStrategy,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Replace `--old` with `--new` in a file.
#[instrument(name = "cmd_apply", skip_all, fields(file = %args.file))]
pub fn cmd_apply(
    args: ApplyArgs,
    global_json: bool,
    config: &Config,
    max_input_bytes: Option<usize>,
) -> anyhow::Result<()> {
    debug!(old_len = args.old.len(), new_len = args.new.len(), "executing apply command");

    let content = read_input_file(&args.file, max_input_bytes)?;
    let (doc, field) = form_field_from_text(&content, LayoutMetrics::default());
    let mut ctx = AnalysisContext::new(doc, OrchestratorSettings::from(config));
    ctx.discover();

    let outcome = match ctx.apply_suggestion(&args.old, &args.new) {
        Ok(outcome) => outcome,
        Err(e) => {
            let notice = ctx
                .take_notices()
                .into_iter()
                .next()
                .map_or_else(|| e.to_string(), |n| n.message);
            bail!("{}: {notice}", args.file);
        }
    };

    let edited = ctx
        .document()
        .value(field)
        .context("edited field lost its value")?
        .to_string();

    if args.write {
        std::fs::write(args.file.as_std_path(), &edited)
            .with_context(|| format!("failed to write {}", args.file))?;
    }

    if global_json {
        let report = ApplyReport {
            file: args.file.to_string(),
            strategy: outcome.strategy,
            written: args.write,
            text: (!args.write).then_some(edited),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.write {
        println!("{} {}", "Updated".green(), args.file);
    } else {
        print!("{edited}");
    }

    Ok(())
}
