//! Segment command: list sentence units with their byte offsets.

use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use simplifica_core::markdown::{InputFormat, strip_to_prose};
use simplifica_core::text::{SegmenterKind, segment_with};

use super::{input_format, read_input_file};

/// Arguments for the `segment` subcommand.
#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// File to segment.
    pub file: Utf8PathBuf,

    /// Segmentation strategy (defaults to the configured one).
    #[arg(long, value_enum)]
    pub segmenter: Option<SegmenterKind>,
}

/// Print the sentence units of a file.
#[instrument(name = "cmd_segment", skip_all, fields(file = %args.file))]
pub fn cmd_segment(
    args: SegmentArgs,
    global_json: bool,
    config_segmenter: SegmenterKind,
    max_input_bytes: Option<usize>,
) -> anyhow::Result<()> {
    let kind = args.segmenter.unwrap_or(config_segmenter);
    debug!(?kind, "executing segment command");

    let content = read_input_file(&args.file, max_input_bytes)?;
    let text = match input_format(&args.file) {
        InputFormat::Markdown => strip_to_prose(&content),
        InputFormat::Plain => content,
    };
    let units = segment_with(&text, kind);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&units)?);
    } else {
        for unit in &units {
            println!(
                "{} {}",
                format!("{:>6}..{:<6}", unit.start, unit.end).dimmed(),
                unit.text
            );
        }
    }

    Ok(())
}
