use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::parsing::{Record, StreamError};

/// Record stream over a tab-delimited file with a header line.
///
/// Lines are read lazily; trailing fields missing from a short line read as
/// blank.
pub struct TabbedStream {
    source: String,
    fields: Vec<String>,
    lines: std::io::Lines<Box<dyn BufRead + Send>>,
}

impl TabbedStream {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(File::open(path)?));
        Self::from_reader(path.display().to_string(), reader)
    }

    /// Build a stream from an already-open reader (used for stdin input).
    pub fn from_reader(
        source: String,
        reader: Box<dyn BufRead + Send>,
    ) -> Result<Self, StreamError> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => String::new(),
        };
        let fields = header
            .split('\t')
            .map(|f| f.trim().to_string())
            .collect::<Vec<_>>();
        Ok(Self {
            source,
            fields,
            lines,
        })
    }

    pub fn find_field(&self, name: &str) -> Result<usize, StreamError> {
        self.fields
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| StreamError::UnknownField(name.to_string(), self.source.clone()))
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Iterator for TabbedStream {
    type Item = Result<Record, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.is_empty() {
                continue;
            }
            let values = line.split('\t').map(str::to_string).collect();
            return Some(Ok(Record::new(values)));
        }
    }
}
