use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::convert::DumpRecord;
use crate::core::ConvertCounts;
use crate::mapper::IdMapper;

/// Recognition patterns for identifier-bearing field keys.
///
/// The patterns are a configuration surface fixed for the duration of a run.
/// Genome and feature key patterns carry an optional single-character suffix
/// capture (`genome_id_2`, `patric_id_b`) distinguishing multiple references
/// in one record.
#[derive(Debug, Clone)]
pub struct KeyPatterns {
    /// Keys holding genome identifiers; capture 1 is the suffix
    pub genome_key: Regex,
    /// Keys holding feature identifiers; capture 2 is the suffix
    pub feature_key: Regex,
    /// Keys holding free text with embedded feature identifiers
    pub phrase_key: Regex,
    /// Lexical shape of a feature identifier inside phrase text
    pub feature_id: Regex,
}

impl Default for KeyPatterns {
    fn default() -> Self {
        Self {
            genome_key: Regex::new(r"^genome_id(_[a-zA-Z0-9])?$").unwrap(),
            feature_key: Regex::new(r"^(patric_id|interactor)(_[a-zA-Z0-9])?$").unwrap(),
            phrase_key: Regex::new(r"^gene_rule$").unwrap(),
            feature_id: Regex::new(r"\bfig\|\d+\.\d+\.[^.\s]+\.\d+\b").unwrap(),
        }
    }
}

/// How a resolved identifier is stored back into the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Replace the original field's value under the same key
    Overwrite,
    /// Add a `*_word` field alongside the original
    AddWord,
}

impl KeyMode {
    /// Count a successful resolution: an overwrite changes an existing field,
    /// add-word creates a new one.
    fn tally(self, counts: &mut ConvertCounts) {
        match self {
            Self::Overwrite => counts.fields_changed += 1,
            Self::AddWord => counts.fields_added += 1,
        }
    }

    /// Key under which the resolved identifier is stored. In add-word mode
    /// the derived key is the base name (suffix stripped) plus `_word` plus
    /// the suffix, so `genome_id_2` yields `genome_id_word_2`.
    fn target_key(self, key: &str, suffix: Option<&str>) -> String {
        match self {
            Self::Overwrite => key.to_string(),
            Self::AddWord => {
                let suffix = suffix.unwrap_or("");
                let base = &key[..key.len() - suffix.len()];
                format!("{base}_word{suffix}")
            }
        }
    }
}

/// Rewrites identifier-bearing fields of a record using an identifier mapper.
pub struct FieldConverter<'a> {
    mapper: &'a dyn IdMapper,
    patterns: &'a KeyPatterns,
    mode: KeyMode,
}

impl<'a> FieldConverter<'a> {
    pub fn new(mapper: &'a dyn IdMapper, patterns: &'a KeyPatterns, mode: KeyMode) -> Self {
        Self {
            mapper,
            patterns,
            mode,
        }
    }

    /// Convert one record in place.
    ///
    /// New and changed fields are staged during the scan and applied
    /// afterwards, so unrelated fields and field order are untouched
    /// (overwrites keep their position, additions append).
    pub fn convert_record(&self, record: &mut DumpRecord, counts: &mut ConvertCounts) {
        counts.records += 1;
        let mut staged: BTreeMap<String, Value> = BTreeMap::new();

        for (key, value) in record.iter() {
            if let Some(caps) = self.patterns.genome_key.captures(key) {
                let suffix = caps.get(1).map(|m| m.as_str());
                self.convert_genome_field(key, suffix, value, &mut staged, counts);
            } else if let Some(caps) = self.patterns.feature_key.captures(key) {
                let suffix = caps.get(2).map(|m| m.as_str());
                self.convert_feature_field(key, suffix, value, &mut staged, counts);
            } else if self.patterns.phrase_key.is_match(key) {
                let rewritten = self.substitute_phrase(&id_text(value), counts);
                staged.insert(key.clone(), Value::String(rewritten));
                counts.fields_changed += 1;
            }
        }

        for (key, value) in staged {
            record.insert(key, value);
        }
    }

    fn convert_genome_field(
        &self,
        key: &str,
        suffix: Option<&str>,
        value: &Value,
        staged: &mut BTreeMap<String, Value>,
        counts: &mut ConvertCounts,
    ) {
        if let Value::Array(items) = value {
            // All-or-nothing: one unresolvable element discards the whole
            // derived array.
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                match self.mapper.genome_word(&id_text(item)) {
                    Some(word) => resolved.push(Value::String(word)),
                    None => return,
                }
            }
            staged.insert(self.mode.target_key(key, suffix), Value::Array(resolved));
            self.mode.tally(counts);
        } else {
            match self.mapper.genome_word(&id_text(value)) {
                Some(word) => {
                    staged.insert(self.mode.target_key(key, suffix), Value::String(word));
                    self.mode.tally(counts);
                }
                None => counts.genomes_missing += 1,
            }
        }
    }

    fn convert_feature_field(
        &self,
        key: &str,
        suffix: Option<&str>,
        value: &Value,
        staged: &mut BTreeMap<String, Value>,
        counts: &mut ConvertCounts,
    ) {
        match self.mapper.feature_word(&id_text(value)) {
            Some(word) => {
                staged.insert(self.mode.target_key(key, suffix), Value::String(word));
                self.mode.tally(counts);
            }
            None => counts.features_missing += 1,
        }
    }

    /// Replace every embedded feature identifier in a phrase. Unresolved
    /// identifiers stay in the text literally but are still counted as
    /// misses; everything between matches is preserved byte for byte.
    fn substitute_phrase(&self, text: &str, counts: &mut ConvertCounts) -> String {
        let mut out = String::with_capacity(text.len() * 2);
        let mut pos = 0;
        for m in self.patterns.feature_id.find_iter(text) {
            out.push_str(&text[pos..m.start()]);
            match self.mapper.feature_word(m.as_str()) {
                Some(word) => out.push_str(&word),
                None => {
                    out.push_str(m.as_str());
                    counts.features_missing += 1;
                }
            }
            pos = m.end();
        }
        out.push_str(&text[pos..]);
        out
    }
}

/// Identifier text of a JSON value (identifiers are stored as strings, but a
/// stray scalar still compares by its JSON text).
fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
