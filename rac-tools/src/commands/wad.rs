//! WAD archive command implementations

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

use rac_wad::Archive;
use rac_wad::archive::LumpRef;

use crate::utils::{
    add_table_row, create_progress_bar, create_table, format_bytes, format_offset,
};

#[derive(Subcommand)]
pub enum WadCommands {
    /// Display the kind and lump layout of an archive
    Info {
        /// Path to the archive
        file: PathBuf,
    },

    /// Extract every lump of an archive into a directory
    Extract {
        /// Path to the archive
        file: PathBuf,

        /// Output directory (defaults to the archive name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite every archive in a directory and check the lumps survive
    Test {
        /// Directory containing the archives
        dir: PathBuf,
    },
}

pub fn execute(cmd: WadCommands) -> Result<()> {
    match cmd {
        WadCommands::Info { file } => handle_info(&file),
        WadCommands::Extract { file, output } => handle_extract(&file, output),
        WadCommands::Test { dir } => handle_test(&dir),
    }
}

fn open_archive(path: &Path) -> Result<(Archive, u64)> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let archive = Archive::read(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read archive {}", path.display()))?;
    Ok((archive, file_size))
}

fn handle_info(path: &Path) -> Result<()> {
    let (archive, file_size) = open_archive(path)?;
    let entries = archive.entries(file_size)?;

    println!("Archive: {}", path.display());
    println!("Kind: {}", archive.kind());
    println!("Header size: {}", format_offset(archive.header().len() as u64));
    println!("File size: {}", format_bytes(file_size));
    println!("Lumps: {}", entries.len());

    if !entries.is_empty() {
        println!();
        let mut table = create_table(vec!["Lump", "Index", "Offset", "Size"]);
        for entry in &entries {
            add_table_row(
                &mut table,
                vec![
                    entry.name.to_string(),
                    entry.index.to_string(),
                    format_offset(entry.offset),
                    format_bytes(entry.size),
                ],
            );
        }
        table.printstd();
    }
    Ok(())
}

fn handle_extract(path: &Path, output: Option<PathBuf>) -> Result<()> {
    let (archive, _) = open_archive(path)?;
    let output = match output {
        Some(output) => output,
        None => PathBuf::from(
            path.file_stem()
                .with_context(|| format!("{} has no file name", path.display()))?,
        ),
    };
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut extracted = 0usize;
    for lump in archive.descriptor().lumps {
        for index in 0..lump.count {
            let Some(value) = (lump.handler.get)(archive.contents(), index)? else {
                continue;
            };
            let bytes = match value {
                LumpRef::Binary(data) => data.to_vec(),
                LumpRef::Gameplay(gameplay) => gameplay.write()?,
            };

            let dest = if lump.count == 1 {
                output.join(format!("{}.bin", lump.name))
            } else {
                let dir = output.join(lump.name);
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                dir.join(format!("{index}.bin"))
            };
            fs::write(&dest, &bytes)
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            log::debug!("Extracted {}[{index}] to {}", lump.name, dest.display());
            extracted += 1;
        }
    }

    println!("Extracted {extracted} lumps to {}", output.display());
    Ok(())
}

/// Differences between two archives of the same kind, as `name[index]` labels
fn differing_lumps(a: &Archive, b: &Archive) -> Result<Vec<String>> {
    if a.kind() != b.kind() {
        return Ok(vec![format!("kind ({} vs {})", a.kind(), b.kind())]);
    }
    let mut differing = Vec::new();
    for lump in a.descriptor().lumps {
        for index in 0..lump.count {
            let left = (lump.handler.get)(a.contents(), index)?;
            let right = (lump.handler.get)(b.contents(), index)?;
            if left != right {
                differing.push(format!("{}[{index}]", lump.name));
            }
        }
    }
    Ok(differing)
}

fn test_archive(path: &Path) -> Result<Vec<String>> {
    let (archive, _) = open_archive(path)?;
    let mut rewritten = Cursor::new(Vec::new());
    archive
        .write(&mut rewritten)
        .with_context(|| format!("Failed to rewrite {}", path.display()))?;
    let reread = Archive::read(&mut rewritten)
        .with_context(|| format!("Failed to read back rewritten {}", path.display()))?;
    differing_lumps(&archive, &reread)
}

fn handle_test(dir: &Path) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wad"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("No .wad files found in {}", dir.display());
    }

    let pb = create_progress_bar(files.len() as u64, "Testing archives");
    let mut failures = Vec::new();
    for path in &files {
        pb.set_message(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        match test_archive(path) {
            Ok(differing) if differing.is_empty() => {
                log::info!("{}: ok", path.display());
            }
            Ok(differing) => failures.push(format!(
                "{}: lumps differ: {}",
                path.display(),
                differing.join(", ")
            )),
            Err(e) => failures.push(format!("{}: {e:#}", path.display())),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    for failure in &failures {
        println!("FAIL {failure}");
    }
    println!(
        "{} of {} archives passed",
        files.len() - failures.len(),
        files.len()
    );
    if !failures.is_empty() {
        bail!("{} archives failed", failures.len());
    }
    Ok(())
}
