//! LZ compressed block command implementations

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

use rac_wad::compression::{compress_wad, decompress_wad, validate_wad};

use crate::utils::{format_bytes, format_compression_ratio};

#[derive(Subcommand)]
pub enum LzCommands {
    /// Decompress a WAD compressed block
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Output file
        output: PathBuf,
    },

    /// Compress a file into a WAD compressed block
    Compress {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Number of worker threads
        #[arg(short, long, default_value = "8")]
        threads: usize,
    },
}

pub fn execute(cmd: LzCommands) -> Result<()> {
    match cmd {
        LzCommands::Decompress { input, output } => handle_decompress(&input, &output),
        LzCommands::Compress {
            input,
            output,
            threads,
        } => handle_compress(&input, &output, threads),
    }
}

fn handle_decompress(input: &Path, output: &Path) -> Result<()> {
    let src = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    if !validate_wad(&src) {
        bail!("{} is not a WAD compressed block", input.display());
    }

    let data = decompress_wad(&src)
        .with_context(|| format!("Failed to decompress {}", input.display()))?;
    fs::write(output, &data).with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!(
        "Decompressed {} to {}",
        input.display(),
        output.display()
    );
    println!(
        "{} -> {}",
        format_bytes(src.len() as u64),
        format_bytes(data.len() as u64)
    );
    Ok(())
}

fn handle_compress(input: &Path, output: &Path, threads: usize) -> Result<()> {
    if threads == 0 {
        bail!("At least one thread is required");
    }

    let src = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let data = compress_wad(&src, threads)
        .with_context(|| format!("Failed to compress {}", input.display()))?;
    fs::write(output, &data).with_context(|| format!("Failed to write {}", output.display()))?;

    log::info!(
        "Compressed {} to {} using {threads} threads",
        input.display(),
        output.display()
    );
    println!(
        "{} -> {} ({} saved)",
        format_bytes(src.len() as u64),
        format_bytes(data.len() as u64),
        format_compression_ratio(src.len() as u64, data.len() as u64)
    );
    Ok(())
}
