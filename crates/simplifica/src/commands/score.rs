//! Score command: Flesch reading ease for a whole file.

use anyhow::bail;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use simplifica_core::markdown::{InputFormat, strip_to_prose};
use simplifica_core::readability::{self, ReadabilityResult, Tier};

use super::{input_format, read_input_file};

/// Arguments for the `score` subcommand.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// File to score.
    pub file: Utf8PathBuf,

    /// Fail when the score is below this value (0-100).
    #[arg(long)]
    pub min_score: Option<f64>,
}

#[derive(Serialize)]
struct ScoreReport {
    file: String,
    readability: Option<ReadabilityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_score: Option<f64>,
    below_min: bool,
}

/// Score a file's readability.
#[instrument(name = "cmd_score", skip_all, fields(file = %args.file))]
pub fn cmd_score(
    args: ScoreArgs,
    global_json: bool,
    max_input_bytes: Option<usize>,
) -> anyhow::Result<()> {
    debug!(file = %args.file, min_score = ?args.min_score, "executing score command");

    let content = read_input_file(&args.file, max_input_bytes)?;
    let prose = match input_format(&args.file) {
        InputFormat::Markdown => strip_to_prose(&content),
        InputFormat::Plain => content,
    };

    let result = readability::score(&prose);
    let below_min = match (&result, args.min_score) {
        (Some(r), Some(min)) => r.score < min,
        _ => false,
    };
    let report = ScoreReport {
        file: args.file.to_string(),
        readability: result,
        min_score: args.min_score,
        below_min,
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(ref r) = report.readability else {
        println!("{}: {}", args.file, "text too short to score".yellow());
        return Ok(());
    };
    if report.below_min {
        bail!(
            "{} scores {:.1} (min: {:.0}). Shorten sentences or prefer shorter words.",
            args.file,
            r.score,
            args.min_score.unwrap_or_default(),
        );
    }

    let score = format!("{:.1}", r.score);
    let score = match r.tier {
        Tier::Easy => score.green().to_string(),
        Tier::Medium => score.yellow().to_string(),
        Tier::Hard => score.red().to_string(),
    };
    match args.min_score {
        Some(min) => println!("{} {} scores {score} (min: {min:.0})", "PASS:".green(), args.file),
        None => println!("{score} {}", r.band.label().dimmed()),
    }
    println!(
        "{}: {} words, {} sentences, {} syllables",
        "Counts".dimmed(),
        r.word_count,
        r.sentence_count,
        r.syllable_count
    );

    Ok(())
}
