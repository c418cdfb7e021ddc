use std::collections::HashMap;
use std::path::Path;

use crate::parsing::{FieldStream, Record};
use crate::template::group::{join_lines, LinkedSpec};
use crate::template::{GlobalStore, LineTemplate, TemplateError};

/// A linked template with its renderings indexed by join key.
///
/// The linked file is rendered eagerly at build time so the main scan is a
/// pure lookup. Records whose join key is blank are skipped, and keys with
/// several records keep every rendering in file order.
pub struct LinkedTemplate {
    main_key: String,
    main_idx: usize,
    fragments: HashMap<String, Vec<String>>,
}

impl LinkedTemplate {
    pub fn build(
        spec: &LinkedSpec,
        dir: &Path,
        globals: &GlobalStore,
    ) -> Result<Self, TemplateError> {
        let mut stream = FieldStream::open(&dir.join(&spec.file))?;
        let key_idx = stream.find_field(&spec.link_key)?;
        let template = LineTemplate::compile(&mut stream, &join_lines(&spec.lines))?;

        let mut fragments: HashMap<String, Vec<String>> = HashMap::new();
        for record in stream {
            let record = record?;
            let key = record.get(key_idx);
            if key.is_empty() {
                continue;
            }
            if let Some(text) = template.render(&record, globals) {
                fragments.entry(key.to_string()).or_default().push(text);
            }
        }

        Ok(Self {
            main_key: spec.main_key.clone(),
            main_idx: 0,
            fragments,
        })
    }

    /// Resolve the join column in the main stream. Must run before the main
    /// scan starts.
    pub fn bind_main_key(&mut self, main: &mut FieldStream) -> Result<(), TemplateError> {
        self.main_idx = main.find_field(&self.main_key)?;
        Ok(())
    }

    /// Renderings linked to a main record, in linked-file order.
    pub fn strings(&self, record: &Record) -> &[String] {
        self.fragments
            .get(record.get(self.main_idx))
            .map_or(&[], Vec::as_slice)
    }
}
