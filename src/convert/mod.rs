//! Rewriting of structured dump records: identifier-key classification, field
//! conversion, and genome-total merging.

pub mod fields;
pub mod kind;
pub mod stats;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

pub use fields::{FieldConverter, KeyMode, KeyPatterns};
pub use kind::ConversionKind;

/// A record as stored in a JSON dump file, with field order preserved.
pub type DumpRecord = Map<String, Value>;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File {0} is not a JSON list of records")]
    NotRecordList(PathBuf),
}

/// An in-memory JSON dump file: a list of records loaded for rewriting.
pub struct DumpFile {
    pub records: Vec<DumpRecord>,
}

impl DumpFile {
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Array(entries) = value else {
            return Err(ConvertError::NotRecordList(path.to_path_buf()));
        };
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::Object(map) => records.push(map),
                _ => return Err(ConvertError::NotRecordList(path.to_path_buf())),
            }
        }
        Ok(Self { records })
    }

    /// Save the records to a target file, one pretty-printed record at a time
    /// (dump files can be large).
    pub fn save(&self, target: &Path) -> Result<(), ConvertError> {
        write_records(target, [&self.records])
    }

    /// Save the records after any records already present in the target file,
    /// used when several source files fan in to one output.
    pub fn save_appending(&self, target: &Path) -> Result<(), ConvertError> {
        if target.exists() {
            let prior = Self::load(target)?;
            info!(
                "Rewriting {} original records from {}.",
                prior.records.len(),
                target.display()
            );
            write_records(target, [&prior.records, &self.records])
        } else {
            write_records(target, [&self.records])
        }
    }
}

fn write_records<'a>(
    target: &Path,
    batches: impl IntoIterator<Item = &'a Vec<DumpRecord>>,
) -> Result<(), ConvertError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(target)?;
    let mut writer = std::io::BufWriter::new(file);
    writeln!(writer, "[")?;
    let mut written = 0u64;
    for batch in batches {
        for record in batch {
            if written > 0 {
                writeln!(writer, ",")?;
            }
            let text = serde_json::to_string_pretty(record)?;
            writer.write_all(text.as_bytes())?;
            written += 1;
        }
    }
    writeln!(writer, "\n]")?;
    info!("{} total records written to {}.", written, target.display());
    Ok(())
}
