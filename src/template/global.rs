use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::parsing::FieldStream;
use crate::template::TemplateError;

/// Shared text and choice lists produced by the global pre-pass.
///
/// The store is mutated only while the global template runs; after that it is
/// read-only, so render tasks can share a reference across threads.
#[derive(Debug, Default)]
pub struct GlobalStore {
    text: HashMap<(String, String), String>,
    choices: HashMap<String, Vec<String>>,
}

impl GlobalStore {
    /// Store a rendered global line under its group's file name and record
    /// key. A key rendered more than once accumulates: the texts are joined
    /// with a space in arrival order.
    pub fn store_text(&mut self, group: &str, key: &str, text: &str) {
        self.text
            .entry((group.to_string(), key.to_string()))
            .and_modify(|prior| {
                prior.push(' ');
                prior.push_str(text);
            })
            .or_insert_with(|| text.to_string());
    }

    pub fn text(&self, group: &str, key: &str) -> Option<&str> {
        self.text
            .get(&(group.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Load choice lists from the named columns of a record stream. Each
    /// column becomes a list under its own name, with blanks and duplicates
    /// dropped.
    pub fn load_choices(
        &mut self,
        stream: &mut FieldStream,
        columns: &[String],
    ) -> Result<(), TemplateError> {
        let mut indexed = Vec::with_capacity(columns.len());
        for column in columns {
            indexed.push((column.clone(), stream.find_field(column)?));
        }

        let mut seen: HashMap<&str, HashSet<String>> = HashMap::new();
        for record in stream {
            let record = record?;
            for (column, idx) in &indexed {
                let value = record.get(*idx);
                if value.is_empty() {
                    continue;
                }
                if seen
                    .entry(column.as_str())
                    .or_default()
                    .insert(value.to_string())
                {
                    self.choices
                        .entry(column.clone())
                        .or_default()
                        .push(value.to_string());
                }
            }
        }
        for column in columns {
            debug!(
                "Choice list {} loaded with {} values.",
                column,
                self.choices.get(column).map_or(0, Vec::len)
            );
        }
        Ok(())
    }

    /// Install a choice list directly (used by tests and callers that already
    /// hold the values).
    pub fn insert_choices(&mut self, name: &str, values: Vec<String>) {
        self.choices.insert(name.to_string(), values);
    }

    pub fn choice_list(&self, name: &str) -> Option<&[String]> {
        self.choices.get(name).map(Vec::as_slice)
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    pub fn choice_len(&self) -> usize {
        self.choices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::TabbedStream;
    use std::io::{BufRead, Cursor};

    fn stream_of(text: &str) -> FieldStream {
        let reader: Box<dyn BufRead + Send> = Box::new(Cursor::new(text.to_string()));
        FieldStream::Tabbed(TabbedStream::from_reader("test".to_string(), reader).unwrap())
    }

    #[test]
    fn test_duplicate_keys_concatenate() {
        let mut store = GlobalStore::default();
        store.store_text("a.json", "k", "first");
        store.store_text("a.json", "k", "second");
        assert_eq!(store.text("a.json", "k"), Some("first second"));
        assert_eq!(store.text_len(), 1);
    }

    #[test]
    fn test_text_scoped_by_group() {
        let mut store = GlobalStore::default();
        store.store_text("a.json", "k", "from a");
        store.store_text("b.json", "k", "from b");
        assert_eq!(store.text("a.json", "k"), Some("from a"));
        assert_eq!(store.text("b.json", "k"), Some("from b"));
        assert!(store.text("c.json", "k").is_none());
    }

    #[test]
    fn test_load_choices_dedups_and_skips_blanks() {
        let mut store = GlobalStore::default();
        let mut stream = stream_of("first\tlast\nAnn\tSmith\nBob\t\nAnn\tJones\n");
        store
            .load_choices(&mut stream, &["first".to_string(), "last".to_string()])
            .unwrap();
        assert_eq!(
            store.choice_list("first").unwrap(),
            ["Ann".to_string(), "Bob".to_string()]
        );
        assert_eq!(
            store.choice_list("last").unwrap(),
            ["Smith".to_string(), "Jones".to_string()]
        );
    }

    #[test]
    fn test_unknown_choice_column_is_error() {
        let mut store = GlobalStore::default();
        let mut stream = stream_of("first\nAnn\n");
        assert!(store
            .load_choices(&mut stream, &["missing".to_string()])
            .is_err());
    }
}
