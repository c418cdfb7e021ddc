use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::cli::KeyModeArg;
use crate::convert::{ConversionKind, DumpFile, FieldConverter, KeyMode, KeyPatterns};
use crate::core::ConvertCounts;
use crate::mapper::{GenomeContext, MagicMapper};

#[derive(Args)]
pub struct MagicArgs {
    /// Master directory whose genome subdirectories are converted
    pub genome_dir: PathBuf,

    /// Additional dump directories converted with the completed mapping
    pub extra_dirs: Vec<PathBuf>,

    /// Directory receiving the converted dumps
    #[arg(long, default_value = "Updates")]
    pub out_dir: PathBuf,

    /// Erase the output directory before processing
    #[arg(long)]
    pub clear: bool,

    /// How converted identifiers are stored
    #[arg(long, value_enum, default_value_t = KeyModeArg::AddWord)]
    pub key_mode: KeyModeArg,
}

/// Execute the magic subcommand.
///
/// Genome directories are converted in parallel over a shared mapper; the
/// extra dump directories follow once every genome's identifiers are
/// registered, since their records can reference any genome.
pub fn run(args: MagicArgs) -> anyhow::Result<()> {
    super::prepare_out_dir(&args.out_dir, args.clear)?;

    let mapper = MagicMapper::new();
    let patterns = KeyPatterns::default();
    let mode = KeyMode::from(args.key_mode);

    let genome_dirs: Vec<PathBuf> = super::subdirectories(&args.genome_dir)?
        .into_iter()
        .filter(|dir| dir.join("genome.json").exists())
        .collect();
    info!(
        "{} genome directories found in {}.",
        genome_dirs.len(),
        args.genome_dir.display()
    );

    let counts = Mutex::new(ConvertCounts::new());
    let failed = Mutex::new(0u64);

    genome_dirs.par_iter().for_each(|dir| {
        match convert_genome_dir(dir, &mapper, &patterns, mode, &args.out_dir) {
            Ok(dir_counts) => counts.lock().merge(&dir_counts),
            Err(e) => {
                error!("Error converting {}: {e:#}", dir.display());
                *failed.lock() += 1;
            }
        }
    });

    let mut extra_files = Vec::new();
    for dir in &args.extra_dirs {
        extra_files.extend(super::json_files(dir)?);
    }
    extra_files.par_iter().for_each(|path| {
        match convert_file(path, ConversionKind::Normal, &mut None, &mapper, &patterns, mode) {
            Ok((dump, file_counts)) => {
                counts.lock().merge(&file_counts);
                if let Err(e) = dump.save(&super::mirrored_path(path, &args.out_dir)) {
                    error!("Error writing {}: {e}", path.display());
                    *failed.lock() += 1;
                }
            }
            Err(e) => {
                error!("Error converting {}: {e:#}", path.display());
                *failed.lock() += 1;
            }
        }
    });

    let counts = counts.into_inner();
    info!("{counts}");
    let failed = failed.into_inner();
    if failed > 0 {
        warn!("{failed} directories or files failed and were skipped.");
    }
    Ok(())
}

/// Convert one genome directory: genome.json establishes the context,
/// genome_feature.json registers the feature words, then the remaining dump
/// files are converted with the completed directory mapping.
fn convert_genome_dir(
    dir: &Path,
    mapper: &MagicMapper,
    patterns: &KeyPatterns,
    mode: KeyMode,
    out_root: &Path,
) -> anyhow::Result<ConvertCounts> {
    let mut counts = ConvertCounts::new();
    let mut ctx: Option<GenomeContext> = None;

    for (path, kind) in super::ordered_files(dir)? {
        let (dump, file_counts) = convert_file(&path, kind, &mut ctx, mapper, patterns, mode)?;
        counts.merge(&file_counts);
        dump.save(&super::mirrored_path(&path, out_root))?;
    }
    Ok(counts)
}

/// Load a dump file, run its registration pass, then convert every record.
/// Registration completes before conversion so records can reference features
/// defined later in the same file.
fn convert_file(
    path: &Path,
    kind: ConversionKind,
    ctx: &mut Option<GenomeContext>,
    mapper: &MagicMapper,
    patterns: &KeyPatterns,
    mode: KeyMode,
) -> anyhow::Result<(DumpFile, ConvertCounts)> {
    let mut dump =
        DumpFile::load(path).with_context(|| format!("loading {}", path.display()))?;

    for record in &dump.records {
        kind.pre_process(record, mapper, ctx);
    }

    let converter = FieldConverter::new(mapper, patterns, mode);
    let mut counts = ConvertCounts::new();
    for record in &mut dump.records {
        converter.convert_record(record, &mut counts);
    }
    Ok((dump, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_files_puts_genome_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["subsystem.json", "genome_feature.json", "genome.json"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }

        let ordered = crate::cli::ordered_files(dir.path()).unwrap();
        let kinds: Vec<_> = ordered.iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            [
                ConversionKind::Genome,
                ConversionKind::Feature,
                ConversionKind::Normal
            ]
        );
    }
}
