use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use clap::Args;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::template::{build_global_store, render_directory, GlobalStore, RunStats};

#[derive(Args)]
pub struct TextArgs {
    /// Template file controlling the text produced for each directory
    pub template: PathBuf,

    /// Directory containing the dump files (or, with --recurse, the dump
    /// subdirectories)
    pub input_dir: PathBuf,

    /// Directory receiving the text files
    pub out_dir: PathBuf,

    /// Process every subdirectory of the input directory
    #[arg(short = 'R', long)]
    pub recurse: bool,

    /// Skip directories whose output file already exists
    #[arg(long)]
    pub missing: bool,

    /// Erase the output directory before processing
    #[arg(long)]
    pub clear: bool,

    /// Extension for the output files
    #[arg(long, default_value = "text")]
    pub output: String,

    /// Directory containing a global.tmpl template and its data files
    #[arg(long)]
    pub global: Option<PathBuf>,
}

/// Execute the text subcommand.
///
/// The global store (if any) is built synchronously up front; directories are
/// then rendered in parallel. A directory that fails is logged and skipped so
/// its siblings still produce output.
pub fn run(args: TextArgs) -> anyhow::Result<()> {
    let template_text = std::fs::read_to_string(&args.template)
        .with_context(|| format!("reading template {}", args.template.display()))?;

    super::prepare_out_dir(&args.out_dir, args.clear)?;

    let globals = match &args.global {
        Some(dir) => {
            let path = dir.join("global.tmpl");
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading global template {}", path.display()))?;
            build_global_store(dir, &text)
                .with_context(|| format!("building global store from {}", dir.display()))?
        }
        None => GlobalStore::default(),
    };

    let dirs = if args.recurse {
        super::subdirectories(&args.input_dir)?
    } else {
        vec![args.input_dir.clone()]
    };

    let mut skipped = 0u64;
    let mut work: Vec<(PathBuf, PathBuf)> = Vec::new();
    for dir in dirs {
        let out_path = output_path(&dir, &args.out_dir, &args.output);
        if args.missing && out_path.exists() {
            skipped += 1;
            continue;
        }
        work.push((dir, out_path));
    }
    info!(
        "{} directories queued for rendering, {} skipped as already done.",
        work.len(),
        skipped
    );

    let tokens = AtomicU64::new(0);
    let totals = Mutex::new(RunStats::default());
    let failed = Mutex::new(0u64);

    work.par_iter().for_each(|(dir, out_path)| {
        match render_directory(dir, &template_text, &globals, out_path, &tokens) {
            Ok(stats) => totals.lock().absorb(stats),
            Err(e) => {
                error!("Error rendering {}: {e}", dir.display());
                *failed.lock() += 1;
            }
        }
    });

    let totals = totals.into_inner();
    let failed = failed.into_inner();
    info!(
        "{} records rendered into {} lines and {} tokens.",
        totals.records,
        totals.written,
        tokens.load(Ordering::Relaxed)
    );
    if failed > 0 {
        warn!("{failed} directories failed and were skipped.");
    }
    Ok(())
}

/// The text file for a directory: the directory's name plus the output
/// extension, in the output directory.
fn output_path(dir: &Path, out_dir: &Path, extension: &str) -> PathBuf {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    out_dir.join(format!("{name}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_directory_name() {
        let path = output_path(
            Path::new("/dumps/511145.12"),
            Path::new("Text"),
            "text",
        );
        assert_eq!(path, Path::new("Text/511145.12.text"));
    }
}
