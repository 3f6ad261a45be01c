//! Moby class command implementations

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use rac_data::{Buffer, Game};
use rac_moby::MobyClass;
use rac_moby::header::MobyClassHeader;

use crate::cli::GameArg;
use crate::utils::{format_bytes, format_offset};

/// Differences listed individually before the rest are only counted
const MAX_REPORTED_DIFFERENCES: usize = 16;

#[derive(Subcommand)]
pub enum MobyCommands {
    /// Display the header and block summary of a moby class
    Info {
        /// Path to the moby class
        file: PathBuf,

        /// Game the class was extracted from
        #[arg(short, long, value_enum)]
        game: GameArg,
    },

    /// Decode and re-encode a moby class and compare the result
    Test {
        /// Path to the moby class
        file: PathBuf,

        /// Game the class was extracted from
        #[arg(short, long, value_enum)]
        game: GameArg,
    },
}

pub fn execute(cmd: MobyCommands) -> Result<()> {
    match cmd {
        MobyCommands::Info { file, game } => handle_info(&file, game.into()),
        MobyCommands::Test { file, game } => handle_test(&file, game.into()),
    }
}

fn handle_info(path: &Path, game: Game) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (class, warnings) = MobyClass::read_with_warnings(&data, game)
        .with_context(|| format!("Failed to parse moby class {}", path.display()))?;

    println!("Moby class: {}", path.display());
    println!("Game: {}", game.short_name());
    println!("Size: {}", format_bytes(data.len() as u64));
    if class.force_rac1_format {
        println!("Layout: R&C1");
    }
    println!("Scale: {}", class.scale);
    println!("Type: {}", class.moby_type);
    println!(
        "Bounding sphere: ({}, {}, {}) r={}",
        class.bounding_sphere.x,
        class.bounding_sphere.y,
        class.bounding_sphere.z,
        class.bounding_sphere.w
    );

    let present = class.sequences.iter().flatten().count();
    println!("Sequences: {present} of {}", class.sequences.len());
    let frames: usize = class
        .sequences
        .iter()
        .flatten()
        .map(|sequence| sequence.frames.len())
        .sum();
    println!("Frames: {frames}");
    println!("Joints: {}", class.joints.len());
    println!("Sound definitions: {}", class.sound_defs.len());
    println!(
        "Submeshes: {} high detail, {} low detail, {} metal",
        class.submeshes.len(),
        class.low_detail_submeshes.len(),
        class.metal_submeshes.len()
    );
    if let Some(bangles) = &class.bangles {
        println!(
            "Bangles: {} ({} submeshes)",
            bangles.bangles.len(),
            bangles.submeshes.len()
        );
    }
    if let Some(corncob) = &class.corncob {
        println!("Corn kernels: {}", corncob.kernels.iter().flatten().count());
    }
    println!("Collision: {}", if class.collision.is_some() { "yes" } else { "no" });
    if !class.mystery_data.is_empty() {
        println!("Unparsed data: {}", format_bytes(class.mystery_data.len() as u64));
    }

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}

/// Byte range of the opaque data in front of the skeleton
fn mystery_range(data: &[u8], class: &MobyClass) -> Result<Range<usize>> {
    let header: MobyClassHeader = Buffer::new(data).read(0, "moby class header")?;
    let end = usize::try_from(header.skeleton).unwrap_or(0);
    Ok(end.saturating_sub(class.mystery_data.len())..end)
}

fn handle_test(path: &Path, game: Game) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let (class, warnings) = MobyClass::read_with_warnings(&data, game)
        .with_context(|| format!("Failed to parse moby class {}", path.display()))?;
    for warning in &warnings {
        log::warn!("{warning}");
    }

    let written = class
        .write(game)
        .with_context(|| format!("Failed to rewrite moby class {}", path.display()))?;
    let skipped = mystery_range(&data, &class)?;

    let differences: Vec<usize> = data
        .iter()
        .zip(&written)
        .enumerate()
        .filter(|(offset, (a, b))| a != b && !skipped.contains(offset))
        .map(|(offset, _)| offset)
        .collect();

    for offset in differences.iter().take(MAX_REPORTED_DIFFERENCES) {
        println!(
            "{}: 0x{:02x} -> 0x{:02x}",
            format_offset(*offset as u64),
            data[*offset],
            written[*offset]
        );
    }
    if differences.len() > MAX_REPORTED_DIFFERENCES {
        println!(
            "... and {} more",
            differences.len() - MAX_REPORTED_DIFFERENCES
        );
    }

    if data.len() != written.len() {
        bail!(
            "Size changed from {} to {} bytes",
            data.len(),
            written.len()
        );
    }
    if !differences.is_empty() {
        bail!("{} bytes differ", differences.len());
    }

    println!("{}: round trip ok", path.display());
    Ok(())
}
