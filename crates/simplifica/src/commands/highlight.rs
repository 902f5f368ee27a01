//! Highlight command: run the full analysis pipeline over a file and report
//! the hard sentences with their on-screen positions.

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use simplifica_core::config::Config;
use simplifica_core::orchestrator::{OrchestratorSettings, PassReport, analyze_text};
use simplifica_core::overlay::HighlightMarker;
use simplifica_core::readability::Tier;
use simplifica_core::tree::{LayoutMetrics, Rect};

use super::{input_format, read_input_file};

/// Arguments for the `highlight` subcommand.
#[derive(Args, Debug)]
pub struct HighlightArgs {
    /// File to analyze.
    pub file: Utf8PathBuf,

    /// Characters per line when laying the text out.
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Exit with an error if any sentence lands in the hard tier.
    #[arg(long)]
    pub fail_on_hard: bool,
}

#[derive(Serialize)]
struct HighlightReport<'a> {
    file: String,
    #[serde(flatten)]
    pass: &'a PassReport,
    markers: &'a [HighlightMarker],
}

/// 1-based visual line and column of a box's top-left corner.
fn line_col(rect: &Rect, metrics: &LayoutMetrics) -> (usize, usize) {
    let line = ((rect.y - metrics.origin.y) / metrics.line_height).round().max(0.0) as usize;
    let col = ((rect.x - metrics.origin.x) / metrics.char_width).round().max(0.0) as usize;
    (line + 1, col + 1)
}

/// Flag hard sentences in a file.
#[instrument(name = "cmd_highlight", skip_all, fields(file = %args.file))]
pub fn cmd_highlight(
    args: HighlightArgs,
    global_json: bool,
    config: &Config,
    max_input_bytes: Option<usize>,
) -> anyhow::Result<()> {
    debug!(width = args.width, "executing highlight command");

    let content = read_input_file(&args.file, max_input_bytes)?;
    let metrics = LayoutMetrics {
        wrap_columns: args.width.max(1),
        ..LayoutMetrics::default()
    };
    let (ctx, _editor, report) = analyze_text(
        &content,
        input_format(&args.file),
        metrics,
        OrchestratorSettings::from(config),
    );
    let report = report.with_context(|| format!("no analysis pass ran over {}", args.file))?;
    let hard = report.flagged.iter().filter(|f| f.tier == Tier::Hard).count();

    if global_json {
        let out = HighlightReport {
            file: args.file.to_string(),
            pass: &report,
            markers: ctx.overlay().markers(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for flagged in &report.flagged {
            let position = flagged
                .marker
                .and_then(|id| ctx.overlay().marker(id))
                .and_then(|m| m.boxes.first())
                .map(|b| {
                    let (line, col) = line_col(b, &metrics);
                    format!("{line}:{col}")
                })
                .unwrap_or_else(|| "-".to_string());
            let score = format!("{:>5.1}", flagged.score);
            let score = match flagged.tier {
                Tier::Hard => score.red().to_string(),
                _ => score.yellow().to_string(),
            };
            println!(
                "{}:{} {score} {} {}",
                args.file,
                position,
                flagged.band.label().dimmed(),
                flagged.text
            );
        }
        println!(
            "{} of {} sentences flagged ({} hard)",
            report.flagged.len(),
            report.units,
            hard
        );
    }

    if args.fail_on_hard && hard > 0 {
        bail!("{} has {hard} hard sentence(s)", args.file);
    }
    Ok(())
}
