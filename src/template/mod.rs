//! The template-group language: parsing, compilation, joins, and rendering.
//!
//! A template file is a sequence of directive groups. Each group opens with a
//! `#main <file> <key>` header naming the record file it renders and is
//! optionally followed by `#linked` groups whose renderings are joined onto
//! the main output by key equality. `#choices` groups, allowed only before the
//! first main group of a global template, load named value lists for the
//! `{{$choice:...}}` directive. Lines starting `##` are comments.

pub mod compile;
pub mod global;
pub mod group;
pub mod link;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::info;

use crate::parsing::{FieldStream, StreamError};

pub use compile::LineTemplate;
pub use global::GlobalStore;
pub use group::{parse_template_file, ChoicesSpec, GroupSpec, LinkedSpec, TemplateFile};
pub use link::LinkedTemplate;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("No data found in template file")]
    EmptyFile,

    #[error("Template file does not start with a #main header")]
    MissingMain,

    #[error("Main template header \"{0}\" has too few parameters")]
    BadMainHeader(String),

    #[error("Template group for {0} has no main template")]
    EmptyMain(String),

    #[error("Linked template header \"{0}\" has too few parameters")]
    BadLinkedHeader(String),

    #[error("Empty linked template with header \"{0}\"")]
    EmptyLinked(String),

    #[error("Choices header \"{0}\" requires a file name and a column name")]
    BadChoicesHeader(String),

    #[error("Invalid placement of #choices record")]
    MisplacedChoices,

    #[error("#choices records are only allowed in a global template")]
    ChoicesNotAllowed,

    #[error("Malformed directive \"{0}\"")]
    BadDirective(String),

    #[error("Unterminated directive near \"{0}\"")]
    UnterminatedDirective(String),
}

/// Counters from rendering one template file against one directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    /// Records read from main files
    pub records: u64,
    /// Non-blank lines written
    pub written: u64,
    /// Linked fragments incorporated
    pub linked: u64,
    /// Characters of output text
    pub chars: u64,
}

impl RunStats {
    /// Fold another run's counters into this one.
    pub fn absorb(&mut self, other: RunStats) {
        self.records += other.records;
        self.written += other.written;
        self.linked += other.linked;
        self.chars += other.chars;
    }
}

/// Build the global store by rendering a global template file.
///
/// This is the synchronous pre-pass: the returned store is immutable and can
/// be read without synchronization by the parallel render tasks. Groups later
/// in the file can reference text stored by earlier groups.
pub fn build_global_store(dir: &Path, template_text: &str) -> Result<GlobalStore, TemplateError> {
    let parsed = parse_template_file(template_text)?;
    let mut store = GlobalStore::default();

    for choices in &parsed.choices {
        let mut stream = FieldStream::open(&dir.join(&choices.file))?;
        store.load_choices(&mut stream, &choices.columns)?;
    }

    for group in &parsed.groups {
        let mut buffered: Vec<(String, String)> = Vec::new();
        run_group(dir, group, &store, &mut |key, text| {
            buffered.push((key.to_string(), text.to_string()));
            Ok(())
        })?;
        for (key, text) in buffered {
            store.store_text(&group.file, &key, &text);
        }
    }

    info!(
        "Global store built with {} text entries and {} choice lists.",
        store.text_len(),
        store.choice_len()
    );
    Ok(store)
}

/// Render a template file against one input directory into a text file, one
/// line per non-blank rendered main record. Tokens written are accumulated
/// into the shared counter.
pub fn render_directory(
    dir: &Path,
    template_text: &str,
    globals: &GlobalStore,
    out_path: &Path,
    tokens: &AtomicU64,
) -> Result<RunStats, TemplateError> {
    use std::io::Write;

    let parsed = parse_template_file(template_text)?;
    if !parsed.choices.is_empty() {
        return Err(TemplateError::ChoicesNotAllowed);
    }

    let file = std::fs::File::create(out_path)?;
    let mut writer = std::io::BufWriter::new(file);
    let mut stats = RunStats::default();
    for group in &parsed.groups {
        let group_stats = run_group(dir, group, globals, &mut |_key, text| {
            tokens.fetch_add(text.split_whitespace().count() as u64, Ordering::Relaxed);
            writeln!(writer, "{text}")
        })?;
        stats.absorb(group_stats);
    }
    writer.flush()?;

    info!(
        "{} of {} records in {} were translated to {} characters of output.",
        stats.written,
        stats.records,
        dir.display(),
        stats.chars
    );
    Ok(stats)
}

/// Run one template group: compile the main template, build the linked join
/// indexes, then scan the main file and emit each non-blank rendering through
/// the output callback.
fn run_group(
    dir: &Path,
    group: &GroupSpec,
    globals: &GlobalStore,
    on_line: &mut dyn FnMut(&str, &str) -> std::io::Result<()>,
) -> Result<RunStats, TemplateError> {
    let main_path = dir.join(&group.file);
    let mut stream = FieldStream::open(&main_path)?;
    let key_idx = stream.find_field(&group.key)?;

    let template = LineTemplate::compile(&mut stream, &group::join_lines(&group.main_lines))?;

    let mut linked = Vec::with_capacity(group.linked.len());
    for spec in &group.linked {
        let mut link = LinkedTemplate::build(spec, dir, globals)?;
        link.bind_main_key(&mut stream)?;
        linked.push(link);
    }

    let mut stats = RunStats::default();
    for record in stream.by_ref() {
        let record = record?;
        stats.records += 1;
        let Some(main_text) = template.render(&record, globals) else {
            continue;
        };
        // Linked fragments follow the main text in declaration order.
        let mut parts: Vec<&str> = vec![&main_text];
        for link in &linked {
            let fragments = link.strings(&record);
            stats.linked += fragments.len() as u64;
            parts.extend(fragments.iter().map(String::as_str));
        }
        let text = parts.join(" ");
        stats.chars += text.len() as u64;
        on_line(record.get(key_idx), &text)?;
        stats.written += 1;
    }
    Ok(stats)
}
