//! Command-line interface for genotext.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **text**: Render genome dump directories into text files using a template
//! - **magic**: Replace dump identifiers with generated word identifiers
//! - **combine**: Merge dump directories onto target genomes using a mapping table
//! - **pubmed**: Report the pubmed ids found in dump directories
//!
//! ## Usage
//!
//! ```text
//! # Render every genome directory under Dumps/ into Text/
//! genotext text genome.tmpl Dumps Text --recurse
//!
//! # Word-identifier conversion of a master genome directory
//! genotext magic Genomes --out-dir Updates
//!
//! # Merge genomes using a mapping piped on stdin
//! cat mapping.tbl | genotext combine Genomes --out-dir Combined
//!
//! # List the pubmed ids referenced by the dumps
//! genotext pubmed control.tbl Dumps --recurse
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::convert::KeyMode;

pub mod combine;
pub mod magic;
pub mod pubmed;
pub mod text;

#[derive(Parser)]
#[command(name = "genotext")]
#[command(version)]
#[command(about = "Rewrite genome dump identifiers and render dumps as prose text")]
#[command(
    long_about = "genotext rewrites the identifiers in genome dump directories and renders the dumps as text.\n\nThe text command drives a template language over the dump records; magic replaces opaque identifiers with readable generated words; combine merges several source genomes onto shared targets."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render genome dump directories into text files using a template
    Text(text::TextArgs),

    /// Replace dump identifiers with generated word identifiers
    Magic(magic::MagicArgs),

    /// Merge dump directories onto target genomes using a mapping table
    Combine(combine::CombineArgs),

    /// Report the pubmed ids found in dump directories
    Pubmed(pubmed::PubmedArgs),
}

/// How converted identifiers are stored back into records.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum KeyModeArg {
    /// Add a *_word field next to the original identifier
    #[default]
    AddWord,
    /// Replace the identifier in place
    Overwrite,
}

impl From<KeyModeArg> for KeyMode {
    fn from(arg: KeyModeArg) -> Self {
        match arg {
            KeyModeArg::AddWord => KeyMode::AddWord,
            KeyModeArg::Overwrite => KeyMode::Overwrite,
        }
    }
}

/// Create the output directory, erasing it first when requested.
pub(crate) fn prepare_out_dir(dir: &Path, clear: bool) -> anyhow::Result<()> {
    if clear && dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Immediate subdirectories of a directory, sorted for a stable work order.
pub(crate) fn subdirectories(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// JSON dump files in a directory, sorted by name.
pub(crate) fn json_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("json")
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Dump files of a genome directory in conversion order: the genome file
/// establishes the context, the feature file registers identifiers, and the
/// rest follow by name.
pub(crate) fn ordered_files(
    dir: &Path,
) -> anyhow::Result<Vec<(PathBuf, crate::convert::ConversionKind)>> {
    use crate::convert::ConversionKind;

    let mut ordered = Vec::new();
    let mut rest = Vec::new();
    for path in json_files(dir)? {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("genome.json") => ordered.insert(0, (path, ConversionKind::Genome)),
            Some("genome_feature.json") => ordered.push((path, ConversionKind::Feature)),
            _ => rest.push((path, ConversionKind::Normal)),
        }
    }
    ordered.extend(rest);
    Ok(ordered)
}

/// Output location mirroring a source file: the source's directory name plus
/// its file name, under the output root.
pub(crate) fn mirrored_path(source: &Path, out_root: &Path) -> PathBuf {
    let mut target = out_root.to_path_buf();
    if let Some(dir) = source.parent().and_then(Path::file_name) {
        target.push(dir);
    }
    if let Some(file) = source.file_name() {
        target.push(file);
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_path_keeps_last_two_components() {
        let source = Path::new("/data/dumps/511145.12/genome.json");
        let target = mirrored_path(source, Path::new("Updates"));
        assert_eq!(target, Path::new("Updates/511145.12/genome.json"));
    }

    #[test]
    fn test_json_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = json_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
    }
}
