//! Command implementations.

use anyhow::Context;
use camino::Utf8Path;
use simplifica_core::markdown::InputFormat;

pub mod apply;
pub mod highlight;
pub mod info;
pub mod key;
pub mod score;
pub mod segment;
#[cfg(feature = "mcp")]
pub mod serve;
pub mod suggest;

/// Read a file and validate its size against the configured limit.
pub fn read_input_file(path: &Utf8Path, max_bytes: Option<usize>) -> anyhow::Result<String> {
    // Preflight: check file size via metadata before reading into memory.
    let metadata =
        std::fs::metadata(path.as_std_path()).with_context(|| format!("failed to read {path}"))?;
    if let Some(max) = max_bytes {
        let size = metadata.len() as usize;
        if size > max {
            anyhow::bail!("input too large: {path} is {size} bytes (limit: {max} bytes)");
        }
    }

    let content = std::fs::read_to_string(path.as_std_path())
        .with_context(|| format!("failed to read {path}"))?;
    Ok(content)
}

/// Input format implied by a file's extension.
pub fn input_format(path: &Utf8Path) -> InputFormat {
    InputFormat::from_extension(path.extension())
}
