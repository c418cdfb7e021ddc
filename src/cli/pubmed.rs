use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::parsing::{FieldStream, TabbedStream, MULTI_VALUE_DELIMITER};

#[derive(Args)]
pub struct PubmedArgs {
    /// Control file naming each dump file and the field holding its pubmed ids
    pub control_file: PathBuf,

    /// Directory containing the dump files (or, with --recurse, the dump
    /// subdirectories)
    pub input_dir: PathBuf,

    /// Process every subdirectory of the input directory
    #[arg(short = 'R', long)]
    pub recurse: bool,

    /// Report file; standard output when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the pubmed subcommand.
///
/// Every pubmed id named by the control file is harvested from the dump
/// directories into a single sorted report, one id per line under a
/// `pubmed_id` header. The report feeds the retrieval of paper data whose
/// text is later included in template output.
pub fn run(args: PubmedArgs) -> anyhow::Result<()> {
    let field_map = read_field_map(&args.control_file)?;

    let dirs = if args.recurse {
        super::subdirectories(&args.input_dir)?
    } else {
        vec![args.input_dir.clone()]
    };
    let ids = harvest(&dirs, &field_map)?;
    info!(
        "{} pubmed ids harvested from {} directories.",
        ids.len(),
        dirs.len()
    );

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            write_report(std::io::BufWriter::new(file), &ids)?;
        }
        None => write_report(std::io::stdout().lock(), &ids)?,
    }
    Ok(())
}

/// Read the control file: a tab-delimited table with a header line whose
/// first column is a dump file name and whose second column is a field in
/// that file holding pubmed ids. A file may be listed more than once.
fn read_field_map(path: &Path) -> anyhow::Result<HashMap<String, Vec<String>>> {
    let stream = TabbedStream::open(path)
        .with_context(|| format!("opening control file {}", path.display()))?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let mut lines = 0u64;
    for record in stream {
        let record = record?;
        let file = record.get(0);
        let field = record.get(1);
        if file.is_empty() || field.is_empty() {
            continue;
        }
        map.entry(file.to_string()).or_default().push(field.to_string());
        lines += 1;
    }
    info!(
        "{} field names read for {} dump files per directory.",
        lines,
        map.len()
    );
    Ok(map)
}

/// Scan the controlled files of every directory and collect the distinct
/// pubmed ids. Multi-valued fields contribute each of their elements; files
/// absent from a directory are skipped.
fn harvest(
    dirs: &[PathBuf],
    field_map: &HashMap<String, Vec<String>>,
) -> anyhow::Result<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for dir in dirs {
        for (file, fields) in field_map {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            let mut stream = FieldStream::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            let mut idxes = Vec::with_capacity(fields.len());
            for field in fields {
                idxes.push(stream.find_field(field)?);
            }

            let mut records = 0u64;
            let mut found = 0u64;
            for record in stream {
                let record = record?;
                records += 1;
                for &idx in &idxes {
                    for id in record.get(idx).split(MULTI_VALUE_DELIMITER) {
                        let id = id.trim();
                        if !id.is_empty() {
                            found += 1;
                            ids.insert(id.to_string());
                        }
                    }
                }
            }
            info!(
                "{} records read from {} with {} pubmed ids.",
                records,
                path.display(),
                found
            );
        }
    }
    Ok(ids)
}

fn write_report(mut writer: impl Write, ids: &BTreeSet<String>) -> anyhow::Result<()> {
    writeln!(writer, "pubmed_id")?;
    for id in ids {
        writeln!(writer, "{id}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_field_map_groups_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join("control.tbl");
        std::fs::write(
            &control,
            "file\tfield\ngenome.json\tpubmed\ngenome.json\tother_pubmed\nppi.json\tpubmed\n",
        )
        .unwrap();

        let map = read_field_map(&control).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["genome.json"], ["pubmed", "other_pubmed"]);
        assert_eq!(map["ppi.json"], ["pubmed"]);
    }

    #[test]
    fn test_harvest_collects_sorted_unique_ids() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("genome.json"),
            r#"[
                {"pubmed": ["123", "45"]},
                {"pubmed": "123"},
                {"pubmed": ""}
            ]"#,
        )
        .unwrap();

        let mut map = HashMap::new();
        map.insert("genome.json".to_string(), vec!["pubmed".to_string()]);

        let ids = harvest(&[dir.path().to_path_buf()], &map).unwrap();
        let listed: Vec<_> = ids.iter().map(String::as_str).collect();
        assert_eq!(listed, ["123", "45"]);
    }

    #[test]
    fn test_harvest_skips_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = HashMap::new();
        map.insert("genome.json".to_string(), vec!["pubmed".to_string()]);

        let ids = harvest(&[dir.path().to_path_buf()], &map).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_report_format() {
        let mut ids = BTreeSet::new();
        ids.insert("123".to_string());
        ids.insert("45".to_string());

        let mut out = Vec::new();
        write_report(&mut out, &ids).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "pubmed_id\n123\n45\n");
    }
}
