use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::{error, info};

use crate::convert::{stats, ConversionKind, DumpFile, FieldConverter, KeyMode, KeyPatterns};
use crate::core::ConvertCounts;
use crate::mapper::{CombineMapper, GenomeContext};
use crate::parsing::{FieldStream, TabbedStream};

#[derive(Args)]
pub struct CombineArgs {
    /// Directory whose genome subdirectories are merged
    pub genome_dir: PathBuf,

    /// Mapping table file (tab-delimited with a header line); stdin when
    /// omitted
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Mapping column holding the source genome identifier
    #[arg(long, default_value = "source_id")]
    pub source_col: String,

    /// Mapping column holding the target genome identifier
    #[arg(long, default_value = "target_id")]
    pub target_col: String,

    /// Directory receiving the merged dumps
    #[arg(long, default_value = "Combined")]
    pub out_dir: PathBuf,

    /// Erase the output directory before processing
    #[arg(long)]
    pub clear: bool,
}

/// Execute the combine subcommand.
///
/// Source directories are processed sequentially: several sources can fan in
/// to the same target files, so each directory must see the records its
/// predecessors wrote.
pub fn run(args: CombineArgs) -> anyhow::Result<()> {
    let mapping = load_mapping(&args)?;
    let mapper = CombineMapper::new(mapping);
    let patterns = KeyPatterns::default();

    super::prepare_out_dir(&args.out_dir, args.clear)?;

    let genome_dirs: Vec<PathBuf> = super::subdirectories(&args.genome_dir)?
        .into_iter()
        .filter(|dir| dir.join("genome.json").exists())
        .collect();
    info!(
        "{} genome directories found in {}.",
        genome_dirs.len(),
        args.genome_dir.display()
    );

    let mut counts = ConvertCounts::new();
    let mut failed = 0u64;
    for dir in &genome_dirs {
        match combine_genome_dir(dir, &mapper, &patterns, &args.out_dir) {
            Ok(dir_counts) => counts.merge(&dir_counts),
            Err(e) => {
                error!("Error combining {}: {e:#}", dir.display());
                failed += 1;
            }
        }
    }

    info!("{counts}");
    if failed > 0 {
        anyhow::bail!("{failed} of {} directories failed", genome_dirs.len());
    }
    Ok(())
}

/// Read the source-to-target genome table from the input file or stdin.
fn load_mapping(args: &CombineArgs) -> anyhow::Result<HashMap<String, String>> {
    let mut stream = match &args.input {
        Some(path) => FieldStream::open(path)
            .with_context(|| format!("opening mapping file {}", path.display()))?,
        None => {
            let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(std::io::stdin()));
            FieldStream::Tabbed(TabbedStream::from_reader("stdin".to_string(), reader)?)
        }
    };
    let source_idx = stream.find_field(&args.source_col)?;
    let target_idx = stream.find_field(&args.target_col)?;

    let mut mapping = HashMap::new();
    for record in stream {
        let record = record?;
        let source = record.get(source_idx);
        let target = record.get(target_idx);
        if source.is_empty() || target.is_empty() {
            continue;
        }
        mapping.insert(source.to_string(), target.to_string());
    }
    info!("{} genome mappings loaded.", mapping.len());
    Ok(mapping)
}

/// Merge one source directory into its target's output directory.
///
/// The genome file goes through the totals merger; every other file appends
/// its converted records to whatever the target already holds.
fn combine_genome_dir(
    dir: &Path,
    mapper: &CombineMapper,
    patterns: &KeyPatterns,
    out_root: &Path,
) -> anyhow::Result<ConvertCounts> {
    let mut counts = ConvertCounts::new();
    let mut ctx: Option<GenomeContext> = None;
    let converter = FieldConverter::new(mapper, patterns, KeyMode::Overwrite);

    for (path, kind) in super::ordered_files(dir)? {
        let mut dump =
            DumpFile::load(&path).with_context(|| format!("loading {}", path.display()))?;
        for record in &dump.records {
            kind.pre_process(record, mapper, &mut ctx);
        }
        for record in &mut dump.records {
            converter.convert_record(record, &mut counts);
        }

        let Some(context) = &ctx else {
            anyhow::bail!("no genome was registered for {}", dir.display());
        };
        let file_name = path
            .file_name()
            .with_context(|| format!("dump file {} has no name", path.display()))?;
        let target_path = out_root.join(&context.word).join(file_name);

        if kind == ConversionKind::Genome {
            merge_genome_file(dump, &target_path, &context.word)?;
        } else {
            dump.save_appending(&target_path)?;
        }
    }
    Ok(counts)
}

/// Write a converted genome file, folding its totals into any genome record
/// the target already holds.
fn merge_genome_file(
    mut dump: DumpFile,
    target_path: &Path,
    target_id: &str,
) -> anyhow::Result<()> {
    if target_path.exists() {
        let mut prev = DumpFile::load(target_path)?;
        match (prev.records.first_mut(), dump.records.first()) {
            (Some(existing), Some(incoming)) => {
                info!("Merging genome totals into {}.", target_path.display());
                stats::merge_into(existing, incoming);
                prev.save(target_path)?;
            }
            _ => dump.save(target_path)?,
        }
    } else {
        if let Some(record) = dump.records.first_mut() {
            stats::rewrite_fresh(record, target_id);
        }
        dump.save(target_path)?;
    }
    Ok(())
}
