//! Field-addressable record streams over dump files.
//!
//! A [`FieldStream`] hides the underlying encoding behind a single interface:
//! field names resolve to ordinals via [`FieldStream::find_field`], and
//! iteration yields [`Record`] values addressed by those ordinals. The file
//! extension selects the decoder: `.json` is a JSON list file, and
//! `.tbl`/`.tab`/`.txt`/`.tsv` are tab-delimited files with a header line.

pub mod json;
pub mod tsv;

use std::path::Path;

use thiserror::Error;

pub use json::JsonStream;
pub use tsv::TabbedStream;

/// Delimiter used when a multi-valued field is flattened into a single string.
pub const MULTI_VALUE_DELIMITER: &str = "::";

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON list file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File {0} is not a JSON list of records")]
    NotRecordList(String),

    #[error("Unsupported input file type: {0}")]
    UnsupportedFormat(String),

    #[error("Field '{0}' not found in {1}")]
    UnknownField(String, String),
}

/// One record from a stream, holding the values for every registered field.
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Value at a field ordinal. Ordinals past the end are blank, which keeps
    /// short tabular lines and sparse JSON records uniform.
    pub fn get(&self, idx: usize) -> &str {
        self.values.get(idx).map_or("", String::as_str)
    }
}

/// A sequential record stream bound to one dump file.
pub enum FieldStream {
    Json(JsonStream),
    Tabbed(TabbedStream),
}

impl FieldStream {
    /// Open a stream, selecting the decoder from the file extension.
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json(JsonStream::open(path)?)),
            Some("tbl" | "tab" | "txt" | "tsv") => Ok(Self::Tabbed(TabbedStream::open(path)?)),
            _ => Err(StreamError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Resolve a field name to its ordinal.
    ///
    /// Tabular streams resolve against the header line and fail on unknown
    /// names. JSON streams register requested names on demand; a key missing
    /// from a record simply renders as blank.
    pub fn find_field(&mut self, name: &str) -> Result<usize, StreamError> {
        match self {
            Self::Json(s) => Ok(s.find_field(name)),
            Self::Tabbed(s) => s.find_field(name),
        }
    }
}

impl Iterator for FieldStream {
    type Item = Result<Record, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Json(s) => s.next().map(Ok),
            Self::Tabbed(s) => s.next(),
        }
    }
}
