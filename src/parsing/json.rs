use std::path::Path;

use serde_json::{Map, Value};

use crate::parsing::{Record, StreamError, MULTI_VALUE_DELIMITER};

/// Record stream over a JSON list file (a top-level array of objects).
///
/// JSON records have no fixed schema, so fields are registered lazily: the
/// first `find_field` call for a name assigns the next ordinal. Records are
/// materialized against the registered fields at iteration time, which is why
/// all lookups must happen before the first `next` call (the template
/// compiler's natural order).
pub struct JsonStream {
    source: String,
    fields: Vec<String>,
    records: std::vec::IntoIter<Map<String, Value>>,
}

impl JsonStream {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let source = path.display().to_string();

        let Value::Array(entries) = value else {
            return Err(StreamError::NotRecordList(source));
        };
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::Object(map) => records.push(map),
                _ => return Err(StreamError::NotRecordList(source)),
            }
        }

        Ok(Self {
            source,
            fields: Vec::new(),
            records: records.into_iter(),
        })
    }

    /// Ordinal for a field name, registering it on first use.
    pub fn find_field(&mut self, name: &str) -> usize {
        if let Some(idx) = self.fields.iter().position(|f| f == name) {
            idx
        } else {
            self.fields.push(name.to_string());
            self.fields.len() - 1
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Iterator for JsonStream {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let values = self
            .fields
            .iter()
            .map(|name| record.get(name).map_or_else(String::new, flatten))
            .collect();
        Some(Record::new(values))
    }
}

/// Flatten a JSON value to the string form used by templates: strings pass
/// through, scalars use their JSON text, arrays join their elements with the
/// multi-value delimiter, and null is blank.
pub fn flatten(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(flatten)
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_DELIMITER),
        other => other.to_string(),
    }
}
