//! Info command: package metadata and the effective configuration.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use simplifica_core::config::{Config, ConfigSources};
use tracing::{debug, instrument};

use super::key::mask_key;

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    license: &'static str,
    repository: &'static str,
}

const PACKAGE: PackageInfo = PackageInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    description: env!("CARGO_PKG_DESCRIPTION"),
    license: env!("CARGO_PKG_LICENSE"),
    repository: env!("CARGO_PKG_REPOSITORY"),
};

/// Configuration as reported; the API key is masked.
#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    endpoint: String,
    model: String,
    target_score: u32,
    debounce_ms: u64,
    reanalyze_delay_ms: u64,
    discovery_interval_ms: u64,
    min_text_length: usize,
    segmenter: String,
}

impl ConfigInfo {
    fn new(config: &Config, sources: &ConfigSources) -> Self {
        Self {
            config_file: sources.primary_file().map(ToString::to_string),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            api_key: config.api_key.as_deref().map(mask_key),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            target_score: config.target_score,
            debounce_ms: config.debounce_ms,
            reanalyze_delay_ms: config.reanalyze_delay_ms,
            discovery_interval_ms: config.discovery_interval_ms,
            min_text_length: config.min_text_length,
            segmenter: format!("{:?}", config.segmenter).to_lowercase(),
        }
    }

    /// Titled groups of label/value rows for the text output.
    fn sections(&self) -> [(&'static str, Vec<(&'static str, String)>); 3] {
        let ms = |v: u64| format!("{v} ms");
        [
            (
                "Configuration",
                vec![
                    (
                        "Config file",
                        self.config_file.clone().unwrap_or_else(|| "none loaded".into()),
                    ),
                    ("Log level", self.log_level.to_string()),
                    (
                        "Log directory",
                        self.log_dir.clone().unwrap_or_else(|| "(not set)".into()),
                    ),
                ],
            ),
            (
                "Analysis",
                vec![
                    ("Target score", self.target_score.to_string()),
                    ("Debounce", ms(self.debounce_ms)),
                    ("Re-analysis delay", ms(self.reanalyze_delay_ms)),
                    ("Discovery interval", ms(self.discovery_interval_ms)),
                    ("Min text length", self.min_text_length.to_string()),
                    ("Segmenter", self.segmenter.clone()),
                ],
            ),
            (
                "Suggestions",
                vec![
                    ("Endpoint", self.endpoint.clone()),
                    ("Model", self.model.clone()),
                    (
                        "API key (config)",
                        self.api_key.clone().unwrap_or_else(|| "(not set)".into()),
                    ),
                ],
            ),
        ]
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
}

/// Print package information and the effective configuration.
#[instrument(name = "cmd_info", skip_all, fields(json_output = global_json))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    debug!("executing info command");
    let config = ConfigInfo::new(config, sources);

    if global_json {
        let full = FullInfo {
            package: PACKAGE,
            config,
        };
        println!("{}", serde_json::to_string_pretty(&full)?);
        return Ok(());
    }

    println!("{} {}", PACKAGE.name.bold(), PACKAGE.version.green());
    println!("{}", PACKAGE.description);
    println!("{}: {}", "License".dimmed(), PACKAGE.license);
    println!("{}: {}", "Repository".dimmed(), PACKAGE.repository.cyan());
    for (title, rows) in config.sections() {
        println!();
        println!("{}", title.bold().underline());
        for (label, value) in rows {
            println!("{}: {}", label.dimmed(), value);
        }
    }
    Ok(())
}
